use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_models::{Reference, ResponseStatus, SearchRequestSpec, SearchResult};
use crate::retry::{Classify, FailureClass};

const STORAGE_SCHEME: &str = "gs://";
const STORAGE_BROWSE_PREFIX: &str = "https://storage.cloud.google.com/";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search service unavailable: {0}")]
    Unavailable(String),
    #[error("search service quota exhausted: {0}")]
    ResourceExhausted(String),
    #[error("search request failed with status {status}: {body}")]
    Request { status: u16, body: String },
    #[error("malformed search response: {0}")]
    MalformedResponse(String),
}

impl Classify for SearchError {
    fn failure_class(&self) -> Option<FailureClass> {
        match self {
            SearchError::Unavailable(_) => Some(FailureClass::TransientUnavailable),
            SearchError::ResourceExhausted(_) => Some(FailureClass::ResourceExhausted),
            SearchError::Request { .. } | SearchError::MalformedResponse(_) => None,
        }
    }
}

/// Rewrite a storage-scheme URI into its https browsing URL. Anything that
/// is not a `gs://` URI passes through unchanged.
pub fn rewrite_storage_uri(uri: &str) -> String {
    match uri.strip_prefix(STORAGE_SCHEME) {
        Some(rest) => format!("{STORAGE_BROWSE_PREFIX}{rest}"),
        None => uri.to_string(),
    }
}

/// The seam between the orchestration core and the managed search service.
/// Handlers and the batch runner only ever see this trait, so tests swap
/// in a fake and production injects the REST client below.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, spec: &SearchRequestSpec) -> Result<SearchResult, SearchError>;
}

/// REST client for the managed search service. Stateless apart from the
/// shared `reqwest::Client`, so one instance serves all requests.
pub struct DiscoveryEngineClient {
    http: reqwest::Client,
    auth_token: Option<String>,
}

impl DiscoveryEngineClient {
    pub fn new(http: reqwest::Client, auth_token: Option<String>) -> DiscoveryEngineClient {
        DiscoveryEngineClient { http, auth_token }
    }

    fn endpoint(location: &str) -> String {
        if location == "global" {
            "discoveryengine.googleapis.com".to_string()
        } else {
            format!("{location}-discoveryengine.googleapis.com")
        }
    }

    fn search_url(spec: &SearchRequestSpec) -> String {
        format!(
            "https://{}/v1/projects/{}/locations/{}/collections/default_collection/engines/{}/servingConfigs/default_config:search",
            Self::endpoint(&spec.location),
            spec.project,
            spec.location,
            spec.engine_id,
        )
    }
}

#[async_trait]
impl SearchBackend for DiscoveryEngineClient {
    async fn search(&self, spec: &SearchRequestSpec) -> Result<SearchResult, SearchError> {
        let url = Self::search_url(spec);
        let body = ApiSearchRequest::for_spec(spec);

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() || err.is_connect() {
                SearchError::Unavailable(err.to_string())
            } else {
                SearchError::Request {
                    status: 0,
                    body: err.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                reqwest::StatusCode::SERVICE_UNAVAILABLE => SearchError::Unavailable(body),
                reqwest::StatusCode::TOO_MANY_REQUESTS => SearchError::ResourceExhausted(body),
                _ => SearchError::Request {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let parsed: ApiSearchResponse = response
            .json()
            .await
            .map_err(|err| SearchError::MalformedResponse(err.to_string()))?;

        normalize_response(parsed)
    }
}

/// Flatten the service's paginated response into answer + references.
fn normalize_response(response: ApiSearchResponse) -> Result<SearchResult, SearchError> {
    let answer = response
        .summary
        .ok_or_else(|| SearchError::MalformedResponse("response carries no summary".to_string()))?
        .summary_text;

    let references = response
        .results
        .into_iter()
        .map(|item| {
            let data = item.document.derived_struct_data;
            Reference {
                title: data.title,
                document: rewrite_storage_uri(&data.link),
            }
        })
        .collect();

    Ok(SearchResult {
        answer,
        references,
        status: ResponseStatus::Success,
    })
}

// ─── Wire shapes ─────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSearchRequest<'a> {
    query: &'a str,
    page_size: u32,
    content_search_spec: ContentSearchSpec<'a>,
    query_expansion_spec: QueryExpansionSpec,
    spell_correction_spec: SpellCorrectionSpec,
}

impl<'a> ApiSearchRequest<'a> {
    fn for_spec(spec: &'a SearchRequestSpec) -> ApiSearchRequest<'a> {
        ApiSearchRequest {
            query: &spec.query,
            page_size: 10,
            content_search_spec: ContentSearchSpec {
                snippet_spec: SnippetSpec {
                    return_snippet: true,
                },
                summary_spec: SummarySpec {
                    summary_result_count: 5,
                    include_citations: true,
                    ignore_adversarial_query: false,
                    ignore_non_summary_seeking_query: true,
                    model_prompt_spec: ModelPromptSpec {
                        preamble: &spec.preamble,
                    },
                    model_spec: ModelSpec { version: "preview" },
                },
            },
            query_expansion_spec: QueryExpansionSpec { condition: "AUTO" },
            spell_correction_spec: SpellCorrectionSpec { mode: "AUTO" },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentSearchSpec<'a> {
    snippet_spec: SnippetSpec,
    summary_spec: SummarySpec<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnippetSpec {
    return_snippet: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarySpec<'a> {
    summary_result_count: u32,
    include_citations: bool,
    ignore_adversarial_query: bool,
    ignore_non_summary_seeking_query: bool,
    model_prompt_spec: ModelPromptSpec<'a>,
    model_spec: ModelSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelPromptSpec<'a> {
    preamble: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelSpec {
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryExpansionSpec {
    condition: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpellCorrectionSpec {
    mode: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSearchResponse {
    #[serde(default)]
    results: Vec<ApiResultItem>,
    summary: Option<ApiSummary>,
}

#[derive(Deserialize)]
struct ApiResultItem {
    document: ApiDocument,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDocument {
    #[serde(default)]
    derived_struct_data: ApiDerivedStructData,
}

#[derive(Deserialize, Default)]
struct ApiDerivedStructData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSummary {
    #[serde(default)]
    summary_text: String,
}
