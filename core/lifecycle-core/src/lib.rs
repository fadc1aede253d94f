//! # lifecycle-core
//!
//! App lifecycle state machine for the browser host, plus the observability
//! shell around it (diagnostics sinks, daily metrics, configuration, FFI).
//!
//! ## Design Principles
//!
//! - **Pure core**: [`transition::apply`] consumes a state and an event and returns
//!   the next state plus an optional [`InvalidTransition`]. No logging, no clocks.
//! - **Fail-soft**: an event the current state does not accept leaves the state
//!   unchanged and is reported, never raised.
//! - **Single writer**: [`LifecycleMachine`] owns the one current state. Callers
//!   that receive events on several threads serialize access themselves
//!   ([`LifecycleEngine`] does it with a `Mutex`).
//! - **FFI-ready**: UniFFI annotations expose [`LifecycleEngine`] to the Swift host.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lifecycle_core::{AppEvent, ApplicationHandle, LifecycleMachine, TracingSink};
//!
//! let app = ApplicationHandle::new("main");
//! let mut machine = LifecycleMachine::new(TracingSink);
//! machine.handle(&AppEvent::launching(app.clone(), None));
//! let state = machine.handle(&AppEvent::Activating { application: app });
//! assert_eq!(state.type_name(), "Active");
//! ```

// UniFFI scaffolding for Swift/Kotlin bindings
uniffi::setup_scaffolding!();

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod ffi;
pub mod machine;
pub mod metrics;
pub mod state;
pub mod storage;
pub mod transition;
pub mod types;

#[cfg(test)]
mod test_logs;

pub use config::{load_config, DiagnosticsConfig, LifecycleConfig, MetricsConfig};
pub use diagnostics::{DiagnosticsSink, FanOutSink, MemorySink, TracingSink};
pub use error::{LifecycleError, LifecycleFfiError, Result};
pub use event::{AppEvent, EventKind};
pub use ffi::{AppEventFfi, AppStateFfi, DiagnosticsDelegate, LifecycleEngine};
pub use machine::LifecycleMachine;
pub use metrics::{InvalidTransitionMetrics, MetricsSink, MetricsSnapshot, PixelEmission};
pub use state::{AppState, StateKind};
pub use storage::StorageConfig;
pub use transition::{apply, InvalidTransition, Transition};
pub use types::{ApplicationHandle, LaunchOptions};
