use crate::index_service::IndexService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Unknown,
    Initializing,
    Ready,
}

/// Tracks whether the index service can take searches. Sole writer of
/// [`ReadinessState`]; once `Ready` it stays `Ready` for the session.
#[derive(Debug)]
pub struct ReadinessMonitor {
    state: ReadinessState,
    notified: bool,
}

impl ReadinessMonitor {
    /// Polls the service exactly once to seed the state.
    pub fn new(service: &dyn IndexService) -> Self {
        let mut monitor = Self::unpolled();
        monitor.poll(service);
        monitor
    }

    pub fn unpolled() -> Self {
        Self {
            state: ReadinessState::Unknown,
            notified: false,
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ReadinessState::Ready
    }

    /// Re-polls once when not ready. No loop: a second failure is the
    /// caller's answer for this attempt.
    pub fn ensure_ready(&mut self, service: &dyn IndexService) -> bool {
        if self.is_ready() {
            return true;
        }
        self.poll(service)
    }

    /// Delivers the one-shot "backend became ready" notification. Returns
    /// `true` only for the first delivery.
    pub fn on_backend_ready(&mut self) -> bool {
        if self.state != ReadinessState::Ready {
            tracing::info!(previous = ?self.state, "index service reported ready");
        }
        self.state = ReadinessState::Ready;
        !std::mem::replace(&mut self.notified, true)
    }

    fn poll(&mut self, service: &dyn IndexService) -> bool {
        let ready = service.check_ready();
        self.state = match (self.state, ready) {
            (_, true) => ReadinessState::Ready,
            (ReadinessState::Ready, false) => ReadinessState::Ready,
            (_, false) => ReadinessState::Initializing,
        };
        tracing::debug!(ready, state = ?self.state, "readiness poll");
        ready
    }
}
