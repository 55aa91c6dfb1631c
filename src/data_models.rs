use serde::{Deserialize, Serialize};

/// Outcome of one call against the managed search service, normalized from
/// the paginated wire response. Field names match the upstream service's
/// JSON contract (`Answer`, `References`, `Status`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResult {
    pub answer: String,
    pub references: Vec<Reference>,
    pub status: ResponseStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Reference {
    pub title: String,
    /// Browsable https URL, rewritten from the storage-scheme URI the
    /// service returns.
    pub document: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Error payload captured into a batch row when its search fails.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorPayload {
    pub status: ResponseStatus,
    pub message: String,
}

/// Per-row response: either the normalized search result or the error that
/// took the row down. Untagged so the wire shape matches the upstream
/// service (success and error payloads are distinguished by their keys).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RowResponse {
    Success(SearchResult),
    Error(ErrorPayload),
}

impl RowResponse {
    pub fn error(message: impl Into<String>) -> Self {
        RowResponse::Error(ErrorPayload {
            status: ResponseStatus::Error,
            message: message.into(),
        })
    }

    pub fn as_success(&self) -> Option<&SearchResult> {
        match self {
            RowResponse::Success(result) => Some(result),
            RowResponse::Error(_) => None,
        }
    }
}

/// One catalog row's outcome, carrying the row metadata alongside the
/// response so the report assembler never has to re-join against the
/// catalog.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BatchResultEntry {
    pub category: String,
    pub subcategory: String,
    pub preamble: String,
    pub search_query: String,
    pub response: RowResponse,
}

/// The sole artifact handed to the report assembler. `results` follows
/// catalog iteration order regardless of dispatch concurrency.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BatchSearchReport {
    pub original_input: String,
    pub results: Vec<BatchResultEntry>,
}

/// Fully determined input for a single search call. No hidden state: two
/// equal specs address the same serving config with the same query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequestSpec {
    pub project: String,
    pub location: String,
    pub engine_id: String,
    pub query: String,
    pub preamble: String,
}

/// The process-level slice of a spec: which engine every batch row talks
/// to. Stamps out one `SearchRequestSpec` per expanded catalog row.
#[derive(Debug, Clone)]
pub struct ServingConfig {
    pub project: String,
    pub location: String,
    pub engine_id: String,
}

impl ServingConfig {
    pub fn spec_for(&self, query: String, preamble: String) -> SearchRequestSpec {
        SearchRequestSpec {
            project: self.project.clone(),
            location: self.location.clone(),
            engine_id: self.engine_id.clone(),
            query,
            preamble,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_serializes_with_service_field_names() {
        let result = SearchResult {
            answer: "Avocados are rich in monounsaturated fat.".to_string(),
            references: vec![Reference {
                title: "Avocado nutrition".to_string(),
                document: "https://storage.cloud.google.com/docs/avocado.pdf".to_string(),
            }],
            status: ResponseStatus::Success,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["Status"], "Success");
        assert_eq!(json["References"][0]["Title"], "Avocado nutrition");
        assert!(json["Answer"].as_str().unwrap().starts_with("Avocados"));
    }

    #[test]
    fn row_response_round_trips_both_variants() {
        let err = RowResponse::error("quota exceeded");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["Status"], "Error");
        assert_eq!(json["Message"], "quota exceeded");

        let parsed: RowResponse = serde_json::from_value(json).unwrap();
        assert!(parsed.as_success().is_none());

        let ok = RowResponse::Success(SearchResult {
            answer: "answer".to_string(),
            references: vec![],
            status: ResponseStatus::Success,
        });
        let parsed: RowResponse =
            serde_json::from_value(serde_json::to_value(&ok).unwrap()).unwrap();
        assert_eq!(parsed.as_success().unwrap().answer, "answer");
    }
}
