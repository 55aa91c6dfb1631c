use std::sync::Arc;
use std::time::Duration;

use forage::batch::BatchRunner;
use forage::catalog::{CatalogRow, QueryCatalog};
use forage::data_models::ResponseStatus;
use forage::retry::RetryPolicy;

mod test_helpers {
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use forage::catalog::CatalogRow;
    use forage::data_models::{
        ResponseStatus, SearchRequestSpec, SearchResult, ServingConfig,
    };
    use forage::search::{SearchBackend, SearchError};

    pub fn row(category: &str, subcategory: &str, template: &str) -> CatalogRow {
        CatalogRow {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            preamble: format!("{category} preamble"),
            query_template: template.to_string(),
        }
    }

    pub fn serving() -> ServingConfig {
        ServingConfig {
            project: "test-project".to_string(),
            location: "global".to_string(),
            engine_id: "test-engine".to_string(),
        }
    }

    type Respond =
        Box<dyn Fn(&SearchRequestSpec, usize) -> Result<SearchResult, SearchError> + Send + Sync>;

    /// Scriptable stand-in for the remote search service. Records every
    /// spec it sees and can delay per query to shuffle completion order.
    pub struct FakeBackend {
        pub specs: Mutex<Vec<SearchRequestSpec>>,
        pub delays: HashMap<String, Duration>,
        respond: Respond,
    }

    impl FakeBackend {
        pub fn answering() -> FakeBackend {
            FakeBackend::with(|spec, _| Ok(success(&format!("answer for {}", spec.query))))
        }

        /// `respond` also receives how many calls this exact query has
        /// already made, so tests can script failures per attempt.
        pub fn with(
            respond: impl Fn(&SearchRequestSpec, usize) -> Result<SearchResult, SearchError>
            + Send
            + Sync
            + 'static,
        ) -> FakeBackend {
            FakeBackend {
                specs: Mutex::new(Vec::new()),
                delays: HashMap::new(),
                respond: Box::new(respond),
            }
        }

        pub fn delayed(mut self, query: &str, delay: Duration) -> FakeBackend {
            self.delays.insert(query.to_string(), delay);
            self
        }

        pub fn calls_for(&self, query: &str) -> usize {
            self.specs
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.query == query)
                .count()
        }
    }

    pub fn success(answer: &str) -> SearchResult {
        SearchResult {
            answer: answer.to_string(),
            references: vec![],
            status: ResponseStatus::Success,
        }
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        async fn search(&self, spec: &SearchRequestSpec) -> Result<SearchResult, SearchError> {
            let prior_calls = {
                let mut specs = self.specs.lock().unwrap();
                let prior = specs.iter().filter(|s| s.query == spec.query).count();
                specs.push(spec.clone());
                prior
            };
            if let Some(delay) = self.delays.get(&spec.query) {
                tokio::time::sleep(*delay).await;
            }
            (self.respond)(spec, prior_calls)
        }
    }
}

use test_helpers::{FakeBackend, row, serving, success};

fn runner(catalog: Vec<CatalogRow>, backend: Arc<FakeBackend>) -> BatchRunner {
    BatchRunner::new(
        Arc::new(QueryCatalog::from_rows(catalog)),
        backend,
        serving(),
        RetryPolicy::transient_unavailable(),
    )
}

#[tokio::test(start_paused = true)]
async fn results_follow_catalog_order_not_completion_order() {
    // The first row takes the longest, so completion order is reversed.
    let backend = Arc::new(
        FakeBackend::answering()
            .delayed("first avocado", Duration::from_millis(30))
            .delayed("second avocado", Duration::from_millis(20))
            .delayed("third avocado", Duration::from_millis(10)),
    );
    let runner = runner(
        vec![
            row("a", "x", "first {}"),
            row("b", "y", "second {}"),
            row("c", "z", "third {}"),
        ],
        backend,
    );

    let report = runner.run_batch("avocado").await;

    assert_eq!(report.results.len(), 3);
    let categories: Vec<&str> = report.results.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(categories, vec!["a", "b", "c"]);

    // Each row's answer came from its own search, not a neighbor's.
    for entry in &report.results {
        let result = entry.response.as_success().unwrap();
        assert_eq!(result.answer, format!("answer for {}", entry.search_query));
    }
}

#[tokio::test(start_paused = true)]
async fn single_row_failure_does_not_abort_the_batch() {
    let backend = Arc::new(FakeBackend::with(|spec, _| {
        if spec.query.starts_with("storage") {
            Err(forage::search::SearchError::Request {
                status: 400,
                body: "bad request".to_string(),
            })
        } else {
            Ok(success("fine"))
        }
    }));
    let runner = runner(
        vec![
            row("nutrition", "fat content", "nutrition {}"),
            row("storage", "shelf life", "storage {}"),
            row("techniques", "preparation", "techniques {}"),
        ],
        Arc::clone(&backend),
    );

    let report = runner.run_batch("pork").await;

    assert_eq!(report.results.len(), 3);
    match &report.results[1].response {
        forage::data_models::RowResponse::Error(payload) => {
            assert_eq!(payload.status, ResponseStatus::Error);
            assert!(payload.message.contains("bad request"));
        }
        other => panic!("expected error row, got {other:?}"),
    }
    assert_eq!(
        report.results[0].response.as_success().unwrap().status,
        ResponseStatus::Success
    );
    assert!(report.results[2].response.as_success().is_some());

    // Permanent failures are not retried.
    assert_eq!(backend.calls_for("storage pork"), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_within_the_batch() {
    let backend = Arc::new(FakeBackend::with(|_, prior_calls| {
        if prior_calls < 2 {
            Err(forage::search::SearchError::Unavailable(
                "try later".to_string(),
            ))
        } else {
            Ok(success("eventually"))
        }
    }));
    let runner = runner(
        vec![row("nutrition", "fat content", "fat in {}")],
        Arc::clone(&backend),
    );

    let report = runner.run_batch("avocado").await;

    let result = report.results[0].response.as_success().unwrap();
    assert_eq!(result.answer, "eventually");
    assert_eq!(backend.calls_for("fat in avocado"), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_become_an_error_row() {
    let backend = Arc::new(FakeBackend::with(|_, _| {
        Err(forage::search::SearchError::Unavailable(
            "still down".to_string(),
        ))
    }));
    let runner = runner(
        vec![row("nutrition", "fat content", "fat in {}")],
        Arc::clone(&backend),
    );

    let report = runner.run_batch("avocado").await;

    assert!(report.results[0].response.as_success().is_none());
    assert_eq!(backend.calls_for("fat in avocado"), 3);
}

#[tokio::test(start_paused = true)]
async fn batch_carries_argument_and_row_metadata_end_to_end() {
    let backend = Arc::new(FakeBackend::answering());
    let runner = runner(
        vec![row("nutrition", "fat content", "fat in {}")],
        Arc::clone(&backend),
    );

    let report = runner.run_batch("avocado").await;

    assert_eq!(report.original_input, "avocado");
    assert_eq!(report.results[0].search_query, "fat in avocado");
    assert_eq!(report.results[0].preamble, "nutrition preamble");

    // The dispatched spec addressed the configured serving config.
    let specs = backend.specs.lock().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].project, "test-project");
    assert_eq!(specs[0].engine_id, "test-engine");
    assert_eq!(specs[0].query, "fat in avocado");
    assert_eq!(specs[0].preamble, "nutrition preamble");
}
