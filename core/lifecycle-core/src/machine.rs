//! Owner of the single current lifecycle state.
//!
//! The host's callback adapter holds one `LifecycleMachine` for the life of
//! the process and feeds it events in arrival order. `&mut self` on
//! [`LifecycleMachine::handle`] is the single-writer guarantee; there is no
//! interior locking here.

use chrono::{DateTime, Utc};

use crate::diagnostics::DiagnosticsSink;
use crate::event::AppEvent;
use crate::state::AppState;
use crate::transition::apply;

pub struct LifecycleMachine<S> {
    state: AppState,
    sink: S,
}

impl<S: DiagnosticsSink> LifecycleMachine<S> {
    /// Starts at `Init`.
    pub fn new(sink: S) -> Self {
        Self::with_state(AppState::Init, sink)
    }

    pub fn with_state(state: AppState, sink: S) -> Self {
        Self { state, sink }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn handle(&mut self, event: &AppEvent) -> &AppState {
        self.handle_at(event, Utc::now())
    }

    /// Applies `event` as if it arrived at `now`. Rejected events leave the
    /// state as it was and go to the sink.
    pub fn handle_at(&mut self, event: &AppEvent, now: DateTime<Utc>) -> &AppState {
        let current = std::mem::take(&mut self.state);
        let from = current.kind();
        let transition = apply(current, event, now);
        self.state = transition.next;

        match transition.rejected {
            Some(rejected) => self.sink.record_invalid_transition(&rejected, now),
            None => tracing::debug!(
                event = event.name(),
                from = from.as_str(),
                to = self.state.type_name(),
                "Lifecycle transition"
            ),
        }

        &self.state
    }
}
