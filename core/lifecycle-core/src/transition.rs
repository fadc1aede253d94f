//! Maps lifecycle events to state transitions.
//!
//! `apply` is total over every (state, event) pair and has no wildcard arm:
//! adding a state or an event fails to compile until its row is written out.
//! Pairs with no defined transition keep the current state and come back
//! as an [`InvalidTransition`] for the caller to report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{AppEvent, EventKind};
use crate::state::{AppState, StateKind};

/// An event the current state does not accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InvalidTransition {
    pub state: StateKind,
    pub event: EventKind,
}

impl InvalidTransition {
    pub fn event_name(&self) -> &'static str {
        self.event.as_str()
    }

    pub fn state_type_name(&self) -> &'static str {
        self.state.as_str()
    }
}

/// Result of applying one event: the next state and, for rejected events,
/// the diagnostic to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: AppState,
    pub rejected: Option<InvalidTransition>,
}

impl Transition {
    fn accept(next: AppState) -> Self {
        Self {
            next,
            rejected: None,
        }
    }

    fn reject(current: AppState, event: &AppEvent) -> Self {
        let rejected = InvalidTransition {
            state: current.kind(),
            event: event.kind(),
        };
        Self {
            next: current,
            rejected: Some(rejected),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected.is_some()
    }
}

/// Computes the state that follows `state` when `event` arrives at `now`.
///
/// `now` only feeds background timestamps; everything else is a function of
/// the state and event alone.
pub fn apply(state: AppState, event: &AppEvent, now: DateTime<Utc>) -> Transition {
    use AppEvent as E;
    use AppState as S;

    match (state, event) {
        // Init
        (S::Init, E::Launching { application, launch_options }) => {
            Transition::accept(S::Launched {
                application: application.clone(),
                launch_options: launch_options.clone(),
            })
        }
        (
            state @ S::Init,
            E::Activating { .. } | E::Backgrounding { .. } | E::Suspending { .. } | E::OpenUrl,
        ) => Transition::reject(state, event),

        // Launched
        (S::Launched { .. }, E::Activating { application }) => Transition::accept(S::Active {
            application: application.clone(),
        }),
        (S::Launched { .. }, E::Backgrounding { application }) => {
            Transition::accept(S::InactiveBackground {
                application: application.clone(),
            })
        }
        (state @ S::Launched { .. }, E::OpenUrl) => Transition::accept(state),
        (state @ S::Launched { .. }, E::Launching { .. } | E::Suspending { .. }) => {
            Transition::reject(state, event)
        }

        // Active
        (S::Active { .. }, E::Suspending { application }) => Transition::accept(S::Inactive {
            application: application.clone(),
        }),
        (state @ S::Active { .. }, E::OpenUrl) => Transition::accept(state),
        (
            state @ S::Active { .. },
            E::Launching { .. } | E::Activating { .. } | E::Backgrounding { .. },
        ) => Transition::reject(state, event),

        // Inactive
        (S::Inactive { .. }, E::Activating { application }) => Transition::accept(S::Active {
            application: application.clone(),
        }),
        (S::Inactive { .. }, E::Backgrounding { application }) => {
            Transition::accept(S::Background {
                application: application.clone(),
                entered_at: now,
            })
        }
        (state @ S::Inactive { .. }, E::OpenUrl) => Transition::accept(state),
        (state @ S::Inactive { .. }, E::Launching { .. } | E::Suspending { .. }) => {
            Transition::reject(state, event)
        }

        // Background
        (S::Background { .. }, E::Activating { application }) => Transition::accept(S::Active {
            application: application.clone(),
        }),
        (S::Background { entered_at, .. }, E::Backgrounding { .. }) => {
            Transition::accept(S::DoubleBackground {
                previous_entered_at: entered_at,
                current_entered_at: now,
                counter: 0,
            })
        }
        (state @ S::Background { .. }, E::OpenUrl) => Transition::accept(state),
        (state @ S::Background { .. }, E::Launching { .. } | E::Suspending { .. }) => {
            Transition::reject(state, event)
        }

        // DoubleBackground
        (S::DoubleBackground { .. }, E::Activating { application }) => {
            Transition::accept(S::Active {
                application: application.clone(),
            })
        }
        (S::DoubleBackground { .. }, E::Suspending { application }) => {
            Transition::accept(S::Inactive {
                application: application.clone(),
            })
        }
        (
            S::DoubleBackground {
                previous_entered_at,
                counter,
                ..
            },
            E::Backgrounding { .. },
        ) => Transition::accept(S::DoubleBackground {
            previous_entered_at,
            current_entered_at: now,
            counter,
        }),
        (state @ S::DoubleBackground { .. }, E::Launching { .. } | E::OpenUrl) => {
            Transition::accept(state)
        }

        // InactiveBackground
        (S::InactiveBackground { .. }, E::Activating { application }) => {
            Transition::accept(S::Active {
                application: application.clone(),
            })
        }
        (S::InactiveBackground { .. }, E::Suspending { application }) => {
            Transition::accept(S::Inactive {
                application: application.clone(),
            })
        }
        (
            state @ S::InactiveBackground { .. },
            E::Launching { .. } | E::Backgrounding { .. } | E::OpenUrl,
        ) => Transition::accept(state),
    }
}
