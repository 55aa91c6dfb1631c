use std::sync::Arc;
use std::time::Duration;

use crate::batch::BatchRunner;
use crate::catalog::QueryCatalog;
use crate::config::Config;
use crate::data_models::ServingConfig;
use crate::search::{DiscoveryEngineClient, SearchBackend};

/// Shared application state. The search backend is constructed here and
/// injected everywhere else, never reached through a global handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<QueryCatalog>,
    pub backend: Arc<dyn SearchBackend>,
    pub runner: Arc<BatchRunner>,
}

impl AppState {
    pub fn new(config: Config, catalog: QueryCatalog) -> anyhow::Result<AppState> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        let backend: Arc<dyn SearchBackend> = Arc::new(DiscoveryEngineClient::new(
            http,
            config.gcp_access_token.clone(),
        ));
        Ok(Self::with_backend(config, catalog, backend))
    }

    /// Build state around an arbitrary backend. Production goes through
    /// `new`; tests hand in a fake.
    pub fn with_backend(
        config: Config,
        catalog: QueryCatalog,
        backend: Arc<dyn SearchBackend>,
    ) -> AppState {
        let catalog = Arc::new(catalog);
        let serving = ServingConfig {
            project: config.google_cloud_project.clone(),
            location: config.default_location.clone(),
            engine_id: config.ai_search_engine_id.clone(),
        };
        let runner = Arc::new(BatchRunner::new(
            Arc::clone(&catalog),
            Arc::clone(&backend),
            serving,
            config.retry_policy.clone(),
        ));

        AppState {
            config,
            catalog,
            backend,
            runner,
        }
    }
}
