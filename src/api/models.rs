use serde::{Deserialize, Serialize};

use crate::data_models::ResponseStatus;

#[derive(Debug, Deserialize)]
pub struct AiSearchRequest {
    /// Overrides the configured engine when set.
    pub engine_id: Option<String>,
    #[serde(default)]
    pub preamble: String,
    #[serde(alias = "query")]
    pub search_query: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchAiSearchRequest {
    pub argument: String,
}

#[derive(Debug, Deserialize)]
pub struct PdfGeneratorRequest {
    pub argument: String,
}

/// Structured error response for the single-search and PDF endpoints,
/// matching the upstream service's error shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorEnvelope {
    pub status: ResponseStatus,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> ErrorEnvelope {
        ErrorEnvelope {
            status: ResponseStatus::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}
