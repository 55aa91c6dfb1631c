use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone)]
pub struct Config {
    /// Target cloud project the serving config lives in.
    pub google_cloud_project: String,
    /// Engine used for every batch row and as the single-search default.
    pub ai_search_engine_id: String,
    /// Serving location; "global" talks to the non-regional endpoint.
    pub default_location: String,
    /// Opaque pass-through: the storage bucket backing the search corpus.
    pub gcp_bucket_name: String,
    /// Opaque pass-through bearer token for the search service.
    pub gcp_access_token: Option<String>,
    /// Static catalog of predefined queries, loaded once at startup.
    pub predefined_queries_file: PathBuf,
    pub bind_addr: String,
    pub retry_policy: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            google_cloud_project: get_env("GOOGLE_CLOUD_PROJECT"),
            ai_search_engine_id: get_env("AI_SEARCH_ENGINE_ID"),
            default_location: get_env_or_default("DEFAULT_LOCATION", "global"),
            gcp_bucket_name: get_env_or_default("GCP_BUCKET_NAME", ""),
            gcp_access_token: env::var("GCP_ACCESS_TOKEN").ok(),
            predefined_queries_file: PathBuf::from(get_env_or_default(
                "PREDEFINED_QUERIES_FILE",
                "data/predefined_queries.csv",
            )),
            bind_addr: get_env_or_default("BIND_ADDR", "0.0.0.0:8080"),
            retry_policy: retry_policy_from_env(),
        }
    }
}

fn retry_policy_from_env() -> RetryPolicy {
    let name = get_env_or_default("RETRY_POLICY", "transient-unavailable");
    let mut policy = RetryPolicy::named(&name)
        .unwrap_or_else(|| panic!("Unknown RETRY_POLICY: {name}"));

    if let Ok(attempts) = env::var("RETRY_MAX_ATTEMPTS") {
        policy.max_attempts = attempts
            .parse()
            .unwrap_or_else(|_| panic!("RETRY_MAX_ATTEMPTS must be an integer, got: {attempts}"));
    }
    if let Ok(secs) = env::var("RETRY_DELAY_SECS") {
        let secs: u64 = secs
            .parse()
            .unwrap_or_else(|_| panic!("RETRY_DELAY_SECS must be an integer, got: {secs}"));
        policy.delay = Duration::from_secs(secs);
    }
    policy
}

fn get_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("Missing required environment variable: {key}"))
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
