//! LifecycleEngine - the entry point for the Swift host.
//!
//! The app delegate creates one engine at launch and forwards every
//! lifecycle callback to [`LifecycleEngine::handle_event`]. UIKit delivers
//! those callbacks on the main thread; the engine still guards the machine
//! with a `Mutex` because UniFFI objects must be `Send + Sync`.
//!
//! Timestamps cross the boundary as RFC 3339 strings (UTC, milliseconds).

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{load_config, LifecycleConfig};
use crate::diagnostics::{DiagnosticsSink, FanOutSink, TracingSink};
use crate::error::{LifecycleFfiError, Result};
use crate::event::AppEvent;
use crate::machine::LifecycleMachine;
use crate::metrics::{InvalidTransitionMetrics, MetricsSink, PixelEmission};
use crate::state::AppState;
use crate::storage::StorageConfig;
use crate::transition::InvalidTransition;
use crate::types::{ApplicationHandle, LaunchOptions};

// ─────────────────────────────────────────────────────────────────────────────
// FFI value types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AppEventFfi {
    Launching {
        application: String,
        launch_options: Option<HashMap<String, String>>,
    },
    Activating {
        application: String,
    },
    Backgrounding {
        application: String,
    },
    Suspending {
        application: String,
    },
    OpenUrl,
}

impl From<AppEventFfi> for AppEvent {
    fn from(event: AppEventFfi) -> Self {
        match event {
            AppEventFfi::Launching {
                application,
                launch_options,
            } => AppEvent::Launching {
                application: ApplicationHandle::new(application),
                launch_options: launch_options.map(|options| options.into_iter().collect()),
            },
            AppEventFfi::Activating { application } => AppEvent::Activating {
                application: ApplicationHandle::new(application),
            },
            AppEventFfi::Backgrounding { application } => AppEvent::Backgrounding {
                application: ApplicationHandle::new(application),
            },
            AppEventFfi::Suspending { application } => AppEvent::Suspending {
                application: ApplicationHandle::new(application),
            },
            AppEventFfi::OpenUrl => AppEvent::OpenUrl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AppStateFfi {
    Init,
    Launched {
        application: String,
        launch_options: Option<HashMap<String, String>>,
    },
    Active {
        application: String,
    },
    Inactive {
        application: String,
    },
    Background {
        application: String,
        entered_at: String,
    },
    DoubleBackground {
        previous_entered_at: String,
        current_entered_at: String,
        counter: u32,
    },
    InactiveBackground {
        application: String,
    },
}

impl From<&AppState> for AppStateFfi {
    fn from(state: &AppState) -> Self {
        match state {
            AppState::Init => AppStateFfi::Init,
            AppState::Launched {
                application,
                launch_options,
            } => AppStateFfi::Launched {
                application: application.to_string(),
                launch_options: launch_options.as_ref().map(options_to_map),
            },
            AppState::Active { application } => AppStateFfi::Active {
                application: application.to_string(),
            },
            AppState::Inactive { application } => AppStateFfi::Inactive {
                application: application.to_string(),
            },
            AppState::Background {
                application,
                entered_at,
            } => AppStateFfi::Background {
                application: application.to_string(),
                entered_at: format_rfc3339_utc(entered_at),
            },
            AppState::DoubleBackground {
                previous_entered_at,
                current_entered_at,
                counter,
            } => AppStateFfi::DoubleBackground {
                previous_entered_at: format_rfc3339_utc(previous_entered_at),
                current_entered_at: format_rfc3339_utc(current_entered_at),
                counter: *counter,
            },
            AppState::InactiveBackground { application } => AppStateFfi::InactiveBackground {
                application: application.to_string(),
            },
        }
    }
}

/// Sent to the host for every rejected event so it can fire its pixels.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct InvalidTransitionReport {
    pub event_name: String,
    pub state_type_name: String,
    pub fire_daily: bool,
    pub count_today: u64,
    pub total: u64,
    pub daily_pixel: String,
    pub count_pixel: String,
}

impl InvalidTransitionReport {
    fn new(rejected: &InvalidTransition, emission: Option<&PixelEmission>) -> Self {
        let pixel = crate::metrics::INVALID_TRANSITION_PIXEL;
        Self {
            event_name: rejected.event_name().to_string(),
            state_type_name: rejected.state_type_name().to_string(),
            // Without metrics there is no history; treat every rejection as new.
            fire_daily: emission.map(|e| e.fire_daily).unwrap_or(true),
            count_today: emission.map(|e| e.count_today).unwrap_or(1),
            total: emission.map(|e| e.total).unwrap_or(1),
            daily_pixel: format!("{}_daily", pixel),
            count_pixel: format!("{}_count", pixel),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct InvalidTransitionCount {
    pub state_type_name: String,
    pub event_name: String,
    pub total: u64,
    pub today: u64,
}

/// Host-side receiver for rejected events (implemented in Swift).
#[uniffi::export(with_foreign)]
pub trait DiagnosticsDelegate: Send + Sync {
    fn invalid_transition(&self, report: InvalidTransitionReport);
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink wiring
// ─────────────────────────────────────────────────────────────────────────────

/// Counts the rejection (when metrics are on) and hands the result to the host.
struct ReportingSink {
    metrics: Option<Arc<MetricsSink>>,
    delegate: Option<Arc<dyn DiagnosticsDelegate>>,
}

impl DiagnosticsSink for ReportingSink {
    fn record_invalid_transition(&self, rejected: &InvalidTransition, at: DateTime<Utc>) {
        let emission = self
            .metrics
            .as_ref()
            .and_then(|metrics| metrics.record(rejected, at));
        if let Some(delegate) = &self.delegate {
            delegate.invalid_transition(InvalidTransitionReport::new(rejected, emission.as_ref()));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(uniffi::Object)]
pub struct LifecycleEngine {
    machine: Mutex<LifecycleMachine<FanOutSink>>,
    metrics: Option<Arc<MetricsSink>>,
    storage: StorageConfig,
    config: LifecycleConfig,
}

impl LifecycleEngine {
    /// Builds an engine rooted at `storage`. Not exposed to FFI.
    pub fn with_storage(
        storage: StorageConfig,
        delegate: Option<Arc<dyn DiagnosticsDelegate>>,
    ) -> Result<Self> {
        let config = load_config(&storage.config_file())?;

        let metrics = if config.metrics.enabled {
            let persisted = if config.metrics.persist {
                InvalidTransitionMetrics::load(&storage.metrics_file())?
            } else {
                InvalidTransitionMetrics::new()
            };
            Some(Arc::new(MetricsSink::new(
                persisted,
                config.metrics.retention_days,
            )))
        } else {
            None
        };

        let mut sink = FanOutSink::new();
        if config.diagnostics.log_invalid_transitions {
            sink.push(Arc::new(TracingSink));
        }
        sink.push(Arc::new(ReportingSink {
            metrics: metrics.clone(),
            delegate,
        }));

        tracing::info!(
            root = %storage.root().display(),
            metrics_enabled = config.metrics.enabled,
            log_invalid_transitions = config.diagnostics.log_invalid_transitions,
            "Lifecycle engine initialized"
        );

        Ok(Self {
            machine: Mutex::new(LifecycleMachine::new(sink)),
            metrics,
            storage,
            config,
        })
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn handle_event_at(&self, event: AppEventFfi, now: DateTime<Utc>) -> AppStateFfi {
        let event = AppEvent::from(event);
        let mut machine = self.lock_machine();
        AppStateFfi::from(machine.handle_at(&event, now))
    }

    // A panic inside a sink must not take lifecycle handling down with it.
    fn lock_machine(&self) -> MutexGuard<'_, LifecycleMachine<FanOutSink>> {
        self.machine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl LifecycleEngine {
    /// Creates an engine whose config and metrics live in `root_dir`
    /// (usually the app group container).
    #[uniffi::constructor]
    pub fn new(root_dir: String) -> std::result::Result<Self, LifecycleFfiError> {
        Self::with_storage(StorageConfig::with_root(PathBuf::from(root_dir)), None)
            .map_err(LifecycleFfiError::from)
    }

    /// Same as `new`, with a delegate notified of every rejected event.
    #[uniffi::constructor]
    pub fn with_delegate(
        root_dir: String,
        delegate: Arc<dyn DiagnosticsDelegate>,
    ) -> std::result::Result<Self, LifecycleFfiError> {
        Self::with_storage(
            StorageConfig::with_root(PathBuf::from(root_dir)),
            Some(delegate),
        )
        .map_err(LifecycleFfiError::from)
    }

    /// Applies one lifecycle callback and returns the resulting state.
    pub fn handle_event(&self, event: AppEventFfi) -> AppStateFfi {
        self.handle_event_at(event, Utc::now())
    }

    pub fn current_state(&self) -> AppStateFfi {
        AppStateFfi::from(self.lock_machine().state())
    }

    /// Aggregated rejection counts, one row per (state, event) pair.
    pub fn invalid_transition_counts(&self) -> Vec<InvalidTransitionCount> {
        let Some(metrics) = &self.metrics else {
            return Vec::new();
        };
        let today = Utc::now().date_naive();
        metrics
            .metrics()
            .iter()
            .map(|(state, event, counter)| InvalidTransitionCount {
                state_type_name: state.as_str().to_string(),
                event_name: event.as_str().to_string(),
                total: counter.total,
                today: counter.count_on(today),
            })
            .collect()
    }

    /// Writes aggregated counters to disk. No-op when metrics or
    /// persistence are disabled.
    pub fn save_metrics(&self) -> std::result::Result<(), LifecycleFfiError> {
        match &self.metrics {
            Some(metrics) if self.config.metrics.persist => metrics
                .save(&self.storage.metrics_file())
                .map_err(LifecycleFfiError::from),
            _ => Ok(()),
        }
    }
}

fn options_to_map(options: &LaunchOptions) -> HashMap<String, String> {
    options
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn format_rfc3339_utc(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    struct RecordingDelegate {
        reports: Mutex<Vec<InvalidTransitionReport>>,
    }

    impl DiagnosticsDelegate for RecordingDelegate {
        fn invalid_transition(&self, report: InvalidTransitionReport) {
            self.reports.lock().unwrap().push(report);
        }
    }

    fn main_app() -> String {
        "main".to_string()
    }

    #[test]
    fn test_engine_walks_launch_to_background() {
        let dir = tempdir().unwrap();
        let engine = LifecycleEngine::new(dir.path().to_string_lossy().to_string()).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        engine.handle_event_at(
            AppEventFfi::Launching {
                application: main_app(),
                launch_options: None,
            },
            t0,
        );
        engine.handle_event_at(AppEventFfi::Activating { application: main_app() }, t0);
        engine.handle_event_at(AppEventFfi::Suspending { application: main_app() }, t0);
        let state =
            engine.handle_event_at(AppEventFfi::Backgrounding { application: main_app() }, t0);

        assert_eq!(
            state,
            AppStateFfi::Background {
                application: main_app(),
                entered_at: "2024-05-01T09:00:00.000Z".to_string(),
            }
        );
        assert_eq!(engine.current_state(), state);
        assert!(engine.invalid_transition_counts().is_empty());
    }

    #[test]
    fn test_engine_reports_rejections_to_delegate_and_metrics() {
        let dir = tempdir().unwrap();
        let delegate = Arc::new(RecordingDelegate {
            reports: Mutex::new(Vec::new()),
        });
        let engine = LifecycleEngine::with_delegate(
            dir.path().to_string_lossy().to_string(),
            delegate.clone(),
        )
        .unwrap();

        let now = Utc::now();
        engine.handle_event_at(AppEventFfi::OpenUrl, now);
        engine.handle_event_at(AppEventFfi::OpenUrl, now);

        let reports = delegate.reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].event_name, "openURL");
        assert_eq!(reports[0].state_type_name, "Init");
        assert!(reports[0].fire_daily);
        assert!(!reports[1].fire_daily);
        assert_eq!(reports[1].total, 2);
        assert_eq!(
            reports[1].daily_pixel,
            "app_did_transition_to_unexpected_state_daily"
        );

        let counts = engine.invalid_transition_counts();
        assert_eq!(
            counts,
            vec![InvalidTransitionCount {
                state_type_name: "Init".to_string(),
                event_name: "openURL".to_string(),
                total: 2,
                today: 2,
            }]
        );
        assert_eq!(engine.current_state(), AppStateFfi::Init);
    }

    #[test]
    fn test_engine_persists_metrics_across_instances() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();

        let engine = LifecycleEngine::new(root.clone()).unwrap();
        engine.handle_event(AppEventFfi::Suspending {
            application: main_app(),
        });
        engine.save_metrics().unwrap();

        let relaunched = LifecycleEngine::new(root).unwrap();
        let counts = relaunched.invalid_transition_counts();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].event_name, "suspending");
        assert_eq!(counts[0].total, 1);
    }

    #[test]
    fn test_engine_respects_disabled_metrics() {
        let dir = tempdir().unwrap();
        fs_err::write(
            dir.path().join("lifecycle.toml"),
            "[metrics]\nenabled = false\n",
        )
        .unwrap();

        let engine = LifecycleEngine::new(dir.path().to_string_lossy().to_string()).unwrap();
        engine.handle_event(AppEventFfi::OpenUrl);
        engine.save_metrics().unwrap();

        assert!(engine.invalid_transition_counts().is_empty());
        assert!(!dir.path().join("invalid-transitions.json").exists());
    }

    #[test]
    fn test_engine_logs_rejections_by_default() {
        let dir = tempdir().unwrap();
        let engine = LifecycleEngine::new(dir.path().to_string_lossy().to_string()).unwrap();

        let logs = crate::test_logs::capture_logs(|| {
            engine.handle_event(AppEventFfi::OpenUrl);
        });

        assert!(logs.contains("Invalid transition (openURL) for state (Init)"));
    }

    #[test]
    fn test_engine_skips_tracing_sink_when_logging_disabled() {
        let dir = tempdir().unwrap();
        fs_err::write(
            dir.path().join("lifecycle.toml"),
            "[diagnostics]\nlog_invalid_transitions = false\n",
        )
        .unwrap();
        let delegate = Arc::new(RecordingDelegate {
            reports: Mutex::new(Vec::new()),
        });
        let engine = LifecycleEngine::with_delegate(
            dir.path().to_string_lossy().to_string(),
            delegate.clone(),
        )
        .unwrap();
        assert!(!engine.config().diagnostics.log_invalid_transitions);

        let logs = crate::test_logs::capture_logs(|| {
            engine.handle_event(AppEventFfi::OpenUrl);
        });

        assert!(!logs.contains("Invalid transition (openURL)"));
        assert_eq!(delegate.reports.lock().unwrap().len(), 1);
        assert_eq!(engine.invalid_transition_counts().len(), 1);
    }

    #[test]
    fn test_engine_handles_rejections_with_huge_retention() {
        let dir = tempdir().unwrap();
        fs_err::write(
            dir.path().join("lifecycle.toml"),
            "[metrics]\nretention_days = 4000000000\n",
        )
        .unwrap();
        let delegate = Arc::new(RecordingDelegate {
            reports: Mutex::new(Vec::new()),
        });
        let engine = LifecycleEngine::with_delegate(
            dir.path().to_string_lossy().to_string(),
            delegate.clone(),
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        engine.handle_event_at(AppEventFfi::OpenUrl, now);
        let state = engine.handle_event_at(AppEventFfi::OpenUrl, now);

        assert_eq!(state, AppStateFfi::Init);
        let reports = delegate.reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].fire_daily);
        assert!(!reports[1].fire_daily);
        assert_eq!(reports[1].total, 2);
    }

    #[test]
    fn test_engine_rejects_malformed_config() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("lifecycle.toml"), "[metrics\n").unwrap();

        let result = LifecycleEngine::new(dir.path().to_string_lossy().to_string());
        assert!(matches!(result, Err(LifecycleFfiError::General { .. })));
    }

    #[test]
    fn test_launch_options_cross_the_boundary() {
        let dir = tempdir().unwrap();
        let engine = LifecycleEngine::new(dir.path().to_string_lossy().to_string()).unwrap();
        let options = HashMap::from([("url".to_string(), "ddgQuickLink://x".to_string())]);

        let state = engine.handle_event(AppEventFfi::Launching {
            application: main_app(),
            launch_options: Some(options.clone()),
        });

        assert_eq!(
            state,
            AppStateFfi::Launched {
                application: main_app(),
                launch_options: Some(options),
            }
        );
    }
}
