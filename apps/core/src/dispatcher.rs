use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::filters::BackendFilters;
use crate::index_service::{IndexError, IndexService, MockIndex};
use crate::model::{Query, ResultEntry, SearchFilters};
use crate::normalize::normalize_batch;
use crate::readiness::ReadinessMonitor;
use crate::transport::TcpIndexClient;

/// Monotonic id of one issued search. Only the latest one may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("index service is not ready")]
    BackendNotReady,
    #[error("search failed: {0}")]
    SearchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchMode {
    Live { endpoint: String },
    Mock,
}

impl DispatchMode {
    pub fn from_config(config: &Config) -> Self {
        match config.index_endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Self::Live {
                endpoint: endpoint.to_string(),
            },
            _ => Self::Mock,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Live { .. } => "live",
            Self::Mock => "mock",
        }
    }

    pub fn build_service(&self, config: &Config) -> Arc<dyn IndexService> {
        match self {
            Self::Live { endpoint } => Arc::new(TcpIndexClient::from_config(config, endpoint)),
            Self::Mock => Arc::new(MockIndex::default().with_max_results(config.max_results)),
        }
    }
}

/// A search ready to run against the index service, on any thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJob {
    pub token: RequestToken,
    pub query: String,
    pub filters: BackendFilters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub token: RequestToken,
    pub result: Result<Vec<ResultEntry>, DispatchError>,
}

impl SearchJob {
    pub fn run(&self, service: &dyn IndexService) -> SearchOutcome {
        let started = Instant::now();
        let result = match service.search(&self.query, &self.filters) {
            Ok(response) => {
                let entries = normalize_batch(response.entries);
                tracing::debug!(
                    token = self.token.value(),
                    returned = entries.len(),
                    total = response.total_count,
                    backend_ms = response.query_time_ms,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "search completed"
                );
                Ok(entries)
            }
            Err(IndexError::NotReady) => Err(DispatchError::BackendNotReady),
            Err(error) => Err(DispatchError::SearchFailed(error.to_string())),
        };
        SearchOutcome {
            token: self.token,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPlan {
    /// Blank query: empty results, no backend call.
    ShortCircuit(RequestToken),
    /// Backend still initializing after the single re-poll.
    NotReady(RequestToken),
    Issue(SearchJob),
}

impl DispatchPlan {
    pub fn token(&self) -> RequestToken {
        match self {
            Self::ShortCircuit(token) | Self::NotReady(token) => *token,
            Self::Issue(job) => job.token,
        }
    }
}

/// Picks the backend, gates on readiness, and decides which response is
/// still wanted.
pub struct SearchDispatcher {
    mode: DispatchMode,
    service: Arc<dyn IndexService>,
    readiness: ReadinessMonitor,
    latest: u64,
}

impl SearchDispatcher {
    pub fn new(mode: DispatchMode, service: Arc<dyn IndexService>) -> Self {
        let readiness = ReadinessMonitor::new(service.as_ref());
        tracing::info!(mode = mode.label(), state = ?readiness.state(), "search dispatcher ready");
        Self {
            mode,
            service,
            readiness,
            latest: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mode = DispatchMode::from_config(config);
        let service = mode.build_service(config);
        Self::new(mode, service)
    }

    pub fn mode(&self) -> &DispatchMode {
        &self.mode
    }

    pub fn service(&self) -> Arc<dyn IndexService> {
        Arc::clone(&self.service)
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn on_backend_ready(&mut self) -> bool {
        self.readiness.on_backend_ready()
    }

    /// Issues a new token, superseding everything issued before it, and
    /// decides how the query is served.
    pub fn begin(&mut self, query: &Query) -> DispatchPlan {
        self.latest += 1;
        let token = RequestToken(self.latest);

        if query.is_blank() {
            return DispatchPlan::ShortCircuit(token);
        }
        if !self.readiness.ensure_ready(self.service.as_ref()) {
            tracing::debug!(token = token.value(), "index not ready; skipping search");
            return DispatchPlan::NotReady(token);
        }

        DispatchPlan::Issue(SearchJob {
            token,
            query: query.trimmed().to_string(),
            filters: BackendFilters::from(&query.filters),
        })
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// `None` when a newer request has been issued since `outcome` started.
    pub fn accept(
        &self,
        outcome: SearchOutcome,
    ) -> Option<Result<Vec<ResultEntry>, DispatchError>> {
        if !self.is_current(outcome.token) {
            tracing::debug!(
                token = outcome.token.value(),
                latest = self.latest,
                "discarding stale search response"
            );
            return None;
        }
        Some(outcome.result)
    }

    /// Runs a whole search inline: plan, backend call, apply.
    pub fn dispatch(
        &mut self,
        text: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<ResultEntry>, DispatchError> {
        match self.begin(&Query::new(text, filters.clone())) {
            DispatchPlan::ShortCircuit(_) => Ok(Vec::new()),
            DispatchPlan::NotReady(_) => Err(DispatchError::BackendNotReady),
            DispatchPlan::Issue(job) => {
                let outcome = job.run(self.service.as_ref());
                self.accept(outcome).unwrap_or_else(|| Ok(Vec::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DispatchError, DispatchMode, DispatchPlan, SearchDispatcher};
    use crate::config::Config;
    use crate::index_service::MockIndex;
    use crate::model::{EntryKind, Query, SearchFilters};

    fn mock_dispatcher() -> SearchDispatcher {
        SearchDispatcher::new(DispatchMode::Mock, Arc::new(MockIndex::default()))
    }

    #[test]
    fn mode_follows_declared_endpoint() {
        let mut config = Config::default();
        assert_eq!(DispatchMode::from_config(&config), DispatchMode::Mock);

        config.index_endpoint = Some("  ".into());
        assert_eq!(DispatchMode::from_config(&config), DispatchMode::Mock);

        config.index_endpoint = Some("127.0.0.1:7878".into());
        assert_eq!(
            DispatchMode::from_config(&config),
            DispatchMode::Live {
                endpoint: "127.0.0.1:7878".into()
            }
        );
    }

    #[test]
    fn mock_dispatch_normalizes_sample_records() {
        let mut dispatcher = mock_dispatcher();
        let results = dispatcher.dispatch("src", &SearchFilters::default()).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, EntryKind::Folder);
        assert_eq!(results[0].extension, None);
    }

    #[test]
    fn invalid_regex_surfaces_as_search_failed() {
        let mut dispatcher = mock_dispatcher();
        let filters = SearchFilters {
            use_regex: true,
            ..Default::default()
        };

        match dispatcher.dispatch("video[", &filters) {
            Err(DispatchError::SearchFailed(message)) => assert!(message.contains("regex")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn every_plan_supersedes_the_previous_token() {
        let mut dispatcher = mock_dispatcher();
        let first = dispatcher.begin(&Query::new("video", SearchFilters::default()));
        let second = dispatcher.begin(&Query::new("", SearchFilters::default()));

        assert!(matches!(first, DispatchPlan::Issue(_)));
        assert!(matches!(second, DispatchPlan::ShortCircuit(_)));
        assert!(second.token() > first.token());
        assert!(!dispatcher.is_current(first.token()));
    }

    #[test]
    fn issued_job_carries_trimmed_text_and_translated_filters() {
        let mut dispatcher = mock_dispatcher();
        let filters = SearchFilters {
            file_types: vec!["pdf".into()],
            ..Default::default()
        };

        match dispatcher.begin(&Query::new("  report ", filters)) {
            DispatchPlan::Issue(job) => {
                assert_eq!(job.query, "report");
                assert_eq!(job.filters.file_types, vec!["pdf".to_string()]);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }
}
