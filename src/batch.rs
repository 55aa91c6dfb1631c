use futures::future;
use std::sync::Arc;

use crate::catalog::QueryCatalog;
use crate::data_models::{BatchResultEntry, BatchSearchReport, RowResponse, ServingConfig};
use crate::retry::{RetryPolicy, with_retry};
use crate::search::SearchBackend;

/// Fans a single argument out across the whole query catalog: one retried
/// search per row, dispatched concurrently, collected back in catalog
/// order. Holds no mutable state; rows share only the read-only catalog
/// and the injected backend.
pub struct BatchRunner {
    catalog: Arc<QueryCatalog>,
    backend: Arc<dyn SearchBackend>,
    serving: ServingConfig,
    retry: RetryPolicy,
}

impl BatchRunner {
    pub fn new(
        catalog: Arc<QueryCatalog>,
        backend: Arc<dyn SearchBackend>,
        serving: ServingConfig,
        retry: RetryPolicy,
    ) -> BatchRunner {
        BatchRunner {
            catalog,
            backend,
            serving,
            retry,
        }
    }

    /// Run every catalog row for `argument`. A failed row is captured into
    /// its entry and never aborts the batch; `join_all` resolves in input
    /// order, which keeps `results` aligned with the catalog no matter how
    /// the individual calls complete.
    pub async fn run_batch(&self, argument: &str) -> BatchSearchReport {
        let rows = self.catalog.expand(argument);
        tracing::info!(rows = rows.len(), argument, "dispatching batch search");

        let searches = rows.into_iter().map(|row| {
            let backend = Arc::clone(&self.backend);
            let spec = self
                .serving
                .spec_for(row.query.clone(), row.preamble.clone());
            let retry = self.retry.clone();

            async move {
                let response = match with_retry(&retry, || backend.search(&spec)).await {
                    Ok(result) => RowResponse::Success(result),
                    Err(err) => {
                        tracing::error!(
                            category = %row.category,
                            subcategory = %row.subcategory,
                            "search failed after retries: {err}"
                        );
                        RowResponse::error(err.to_string())
                    }
                };

                BatchResultEntry {
                    category: row.category,
                    subcategory: row.subcategory,
                    preamble: row.preamble,
                    search_query: row.query,
                    response,
                }
            }
        });

        let results = future::join_all(searches).await;

        BatchSearchReport {
            original_input: argument.to_string(),
            results,
        }
    }
}
