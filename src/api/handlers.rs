use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::data_models::{BatchSearchReport, SearchRequestSpec, SearchResult};
use crate::report;
use crate::retry::with_retry;
use crate::state::AppState;

use super::models::{
    AiSearchRequest, BatchAiSearchRequest, ErrorEnvelope, HealthResponse, PdfGeneratorRequest,
};

type ApiError = (StatusCode, Json<ErrorEnvelope>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorEnvelope::new(message)))
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "API operational.",
    })
}

/// Single retried search against the configured (or caller-overridden)
/// engine. Failures come back as a structured error envelope.
pub async fn ai_search_handler(
    State(state): State<AppState>,
    Json(request): Json<AiSearchRequest>,
) -> Result<Json<SearchResult>, ApiError> {
    if request.search_query.trim().is_empty() {
        return Err(bad_request("Search query cannot be empty"));
    }

    let spec = SearchRequestSpec {
        project: state.config.google_cloud_project.clone(),
        location: request
            .location
            .unwrap_or_else(|| state.config.default_location.clone()),
        engine_id: request
            .engine_id
            .unwrap_or_else(|| state.config.ai_search_engine_id.clone()),
        query: request.search_query,
        preamble: request.preamble,
    };

    let backend = state.backend.clone();
    match with_retry(&state.config.retry_policy, || backend.search(&spec)).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            tracing::error!("search request failed: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorEnvelope::new(format!(
                    "An error occurred while processing the search request: {err}"
                ))),
            ))
        }
    }
}

/// Fan the argument out across the predefined query catalog. Per-row
/// failures are captured inside the report, so this always returns the
/// full report shape.
pub async fn batch_ai_search_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchAiSearchRequest>,
) -> Result<Json<BatchSearchReport>, ApiError> {
    let argument = request.argument.trim();
    if argument.is_empty() {
        return Err(bad_request("Argument cannot be empty"));
    }

    Ok(Json(state.runner.run_batch(argument).await))
}

/// Run the batch and render it as a downloadable PDF report.
pub async fn pdf_generator_handler(
    State(state): State<AppState>,
    Json(request): Json<PdfGeneratorRequest>,
) -> Result<Response, ApiError> {
    let argument = request.argument.trim().to_string();
    if argument.is_empty() {
        return Err(bad_request("Argument cannot be empty"));
    }

    let batch_report = state.runner.run_batch(&argument).await;
    let pdf = report::generate(&batch_report).map_err(|err| {
        tracing::error!("report rendering failed: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorEnvelope::new(format!(
                "An error occurred while generating the report: {err}"
            ))),
        )
    })?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={argument}_recipes.pdf"),
        ),
    ];

    Ok((headers, pdf).into_response())
}
