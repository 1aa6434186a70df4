use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::debounce::QueryDebouncer;
use crate::dispatcher::{DispatchError, DispatchPlan, SearchDispatcher, SearchJob, SearchOutcome};
use crate::index_service::IndexService;
use crate::inline_answer::{self, InlineAnswer};
use crate::model::{Query, ResultEntry, SearchFilters};
use crate::os_integration::{ActionError, OsIntegration};
use crate::selection::{Activation, Direction, SelectionNavigator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    QueryChanged(String),
    FiltersChanged(SearchFilters),
    Tick,
    SearchCompleted(SearchOutcome),
    BackendReady,
    MoveSelection(Direction),
    Hover(usize),
    Submit { reveal: bool },
    Escape,
}

/// Everything a presenter needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub query: String,
    pub filters: SearchFilters,
    pub results: Vec<ResultEntry>,
    pub loading: bool,
    pub backend_ready: bool,
    pub selected: Option<usize>,
    pub inline_answer: InlineAnswer,
    pub notice: Option<String>,
}

impl Snapshot {
    /// A calculator answer hides the result list.
    pub fn visible_results(&self) -> &[ResultEntry] {
        if self.inline_answer.is_some() {
            &[]
        } else {
            &self.results
        }
    }
}

pub trait Presenter {
    fn present(&mut self, snapshot: &Snapshot);

    fn scroll_into_view(&mut self, _index: usize) {}
}

#[derive(Debug, Default)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {
    fn present(&mut self, _snapshot: &Snapshot) {}
}

/// Keeps every published snapshot and scroll request. Clones share storage.
#[derive(Debug, Default, Clone)]
pub struct RecordingPresenter {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
    scrolls: Arc<Mutex<Vec<usize>>>,
}

impl RecordingPresenter {
    pub fn last(&self) -> Option<Snapshot> {
        self.snapshots
            .lock()
            .ok()
            .and_then(|snapshots| snapshots.last().cloned())
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots
            .lock()
            .map(|snapshots| snapshots.clone())
            .unwrap_or_default()
    }

    pub fn scrolls(&self) -> Vec<usize> {
        self.scrolls
            .lock()
            .map(|scrolls| scrolls.clone())
            .unwrap_or_default()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, snapshot: &Snapshot) {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push(snapshot.clone());
        }
    }

    fn scroll_into_view(&mut self, index: usize) {
        if let Ok(mut scrolls) = self.scrolls.lock() {
            scrolls.push(index);
        }
    }
}

/// Runs search jobs. An executor that finishes synchronously returns the
/// outcome; one that runs elsewhere returns `None` and delivers the outcome
/// later as [`EngineEvent::SearchCompleted`].
pub trait SearchExecutor {
    fn submit(&mut self, job: SearchJob, service: Arc<dyn IndexService>) -> Option<SearchOutcome>;
}

#[derive(Debug, Default)]
pub struct ImmediateExecutor;

impl SearchExecutor for ImmediateExecutor {
    fn submit(&mut self, job: SearchJob, service: Arc<dyn IndexService>) -> Option<SearchOutcome> {
        Some(job.run(service.as_ref()))
    }
}

/// Parks jobs until the caller runs them, in whatever order it likes.
#[derive(Debug, Default, Clone)]
pub struct DeferredExecutor {
    jobs: Arc<Mutex<Vec<SearchJob>>>,
}

impl DeferredExecutor {
    pub fn take_jobs(&self) -> Vec<SearchJob> {
        self.jobs
            .lock()
            .map(|mut jobs| std::mem::take(&mut *jobs))
            .unwrap_or_default()
    }
}

impl SearchExecutor for DeferredExecutor {
    fn submit(&mut self, job: SearchJob, _service: Arc<dyn IndexService>) -> Option<SearchOutcome> {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job);
        }
        None
    }
}

/// Single-threaded launcher state machine. Feed it events, it publishes
/// snapshots.
pub struct LauncherEngine {
    dispatcher: SearchDispatcher,
    debouncer: QueryDebouncer<Query>,
    executor: Box<dyn SearchExecutor>,
    presenter: Box<dyn Presenter>,
    os: Box<dyn OsIntegration>,
    query: String,
    filters: SearchFilters,
    results: Vec<ResultEntry>,
    loading: bool,
    selection: SelectionNavigator,
    inline_answer: InlineAnswer,
    notice: Option<String>,
}

impl LauncherEngine {
    pub fn new(
        dispatcher: SearchDispatcher,
        executor: Box<dyn SearchExecutor>,
        presenter: Box<dyn Presenter>,
        os: Box<dyn OsIntegration>,
    ) -> Self {
        Self {
            dispatcher,
            debouncer: QueryDebouncer::default(),
            executor,
            presenter,
            os,
            query: String::new(),
            filters: SearchFilters::default(),
            results: Vec::new(),
            loading: false,
            selection: SelectionNavigator::default(),
            inline_answer: InlineAnswer::None,
            notice: None,
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = QueryDebouncer::new(delay);
        self
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    pub fn results(&self) -> &[ResultEntry] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_backend_ready(&self) -> bool {
        self.dispatcher.is_ready()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selection.selected()
    }

    pub fn inline_answer(&self) -> &InlineAnswer {
        &self.inline_answer
    }

    pub fn dispatcher(&self) -> &SearchDispatcher {
        &self.dispatcher
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            query: self.query.clone(),
            filters: self.filters.clone(),
            results: self.results.clone(),
            loading: self.loading,
            backend_ready: self.dispatcher.is_ready(),
            selected: self.selection.selected(),
            inline_answer: self.inline_answer.clone(),
            notice: self.notice.clone(),
        }
    }

    pub fn handle(&mut self, now: Instant, event: EngineEvent) {
        match event {
            EngineEvent::QueryChanged(text) => {
                self.inline_answer = inline_answer::evaluate(&text);
                self.query = text;
                self.schedule(now);
            }
            EngineEvent::FiltersChanged(filters) => {
                self.filters = filters;
                self.reset_selection();
                self.schedule(now);
            }
            EngineEvent::Tick => {
                if let Some(query) = self.debouncer.poll(now) {
                    self.run_query(query);
                }
            }
            EngineEvent::SearchCompleted(outcome) => self.apply(outcome),
            EngineEvent::BackendReady => {
                if self.dispatcher.on_backend_ready() && !self.query.trim().is_empty() {
                    self.debouncer.cancel();
                    self.run_query(Query::new(self.query.clone(), self.filters.clone()));
                }
            }
            // The calculator row owns the highlight while it is shown.
            EngineEvent::MoveSelection(_) | EngineEvent::Hover(_)
                if self.inline_answer.is_some() => {}
            EngineEvent::MoveSelection(direction) => {
                if let Some(index) = self.selection.move_selection(direction) {
                    self.presenter.scroll_into_view(index);
                }
            }
            EngineEvent::Hover(index) => {
                if let Some(index) = self.selection.hover(index) {
                    self.presenter.scroll_into_view(index);
                }
            }
            EngineEvent::Submit { reveal } => self.submit(reveal),
            EngineEvent::Escape => self.hide(),
        }

        self.publish();
    }

    fn schedule(&mut self, now: Instant) {
        self.debouncer
            .schedule(now, Query::new(self.query.clone(), self.filters.clone()));
    }

    fn run_query(&mut self, query: Query) {
        match self.dispatcher.begin(&query) {
            DispatchPlan::ShortCircuit(_) | DispatchPlan::NotReady(_) => {
                self.loading = false;
                self.replace_results(Vec::new());
            }
            DispatchPlan::Issue(job) => {
                tracing::debug!(token = job.token.value(), query = %job.query, "dispatching search");
                self.loading = true;
                let service = self.dispatcher.service();
                if let Some(outcome) = self.executor.submit(job, service) {
                    self.apply(outcome);
                }
            }
        }
    }

    fn apply(&mut self, outcome: SearchOutcome) {
        let Some(result) = self.dispatcher.accept(outcome) else {
            return;
        };

        self.loading = false;
        match result {
            Ok(entries) => self.replace_results(entries),
            Err(DispatchError::BackendNotReady) => self.replace_results(Vec::new()),
            Err(DispatchError::SearchFailed(message)) => {
                tracing::warn!(query = %self.query, error = %message, "search failed");
                self.replace_results(Vec::new());
            }
        }
    }

    fn replace_results(&mut self, results: Vec<ResultEntry>) {
        self.results = results;
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        if let Some(index) = self.selection.reset(self.results.len()) {
            self.presenter.scroll_into_view(index);
        }
    }

    fn submit(&mut self, reveal: bool) {
        if let Some(value) = self.inline_answer.calculator_value().map(str::to_string) {
            let result = self.os.copy_text(&value);
            self.finish_action("copy", &value, result);
            return;
        }

        let selected = self
            .selection
            .selected()
            .and_then(|index| self.results.get(index));
        if let Some(entry) = selected {
            let activation = Activation::for_entry(entry, reveal);
            self.activate(activation);
            return;
        }

        if self.results.is_empty() {
            if let Some(url) = inline_answer::resolve_url_shortcut(&self.query) {
                self.activate(Activation::OpenLink(url));
                return;
            }
        }

        tracing::debug!(query = %self.query, "submit with nothing to act on");
    }

    fn activate(&mut self, activation: Activation) {
        let result = match &activation {
            Activation::OpenFile(path) => self.os.open_file(path),
            Activation::RevealFile(path) => self.os.open_file_location(path),
            Activation::OpenLink(url) => self.os.open_link(url),
        };
        self.finish_action(activation.label(), activation.target(), result);
    }

    fn finish_action(&mut self, action: &str, target: &str, result: Result<(), ActionError>) {
        match result {
            Ok(()) => self.hide(),
            Err(error) => {
                tracing::warn!(action, target, %error, "action failed");
                self.notice = Some(format!("Could not {action} {target}: {error}"));
            }
        }
    }

    fn hide(&mut self) {
        if let Err(error) = self.os.hide_window() {
            tracing::warn!(%error, "hide window failed");
        }
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.notice = None;
        self.presenter.present(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::{EngineEvent, ImmediateExecutor, LauncherEngine, RecordingPresenter, Snapshot};
    use crate::dispatcher::{DispatchMode, SearchDispatcher};
    use crate::index_service::MockIndex;
    use crate::inline_answer::InlineAnswer;
    use crate::model::ResultEntry;
    use crate::os_integration::RecordingIntegration;

    fn engine(presenter: RecordingPresenter) -> LauncherEngine {
        LauncherEngine::new(
            SearchDispatcher::new(DispatchMode::Mock, Arc::new(MockIndex::default())),
            Box::new(ImmediateExecutor),
            Box::new(presenter),
            Box::new(RecordingIntegration::default()),
        )
    }

    #[test]
    fn calculator_answer_hides_results() {
        let snapshot = Snapshot {
            results: vec![ResultEntry::url("https://example.com")],
            inline_answer: InlineAnswer::Calculator("4".into()),
            ..Default::default()
        };
        assert!(snapshot.visible_results().is_empty());
    }

    #[test]
    fn every_event_publishes_a_snapshot() {
        let presenter = RecordingPresenter::default();
        let mut engine = engine(presenter.clone());
        let now = Instant::now();

        engine.handle(now, EngineEvent::QueryChanged("pdf".into()));
        engine.handle(now, EngineEvent::Tick);

        assert_eq!(presenter.snapshots().len(), 2);
        assert_eq!(presenter.last().unwrap().query, "pdf");
        assert!(engine.next_deadline().is_some());
    }
}
