//! Daily aggregation of rejected lifecycle events.
//!
//! Every `(state type, event name)` pair gets its own counter. Recording a
//! rejection yields a [`PixelEmission`] telling the host which pings to fire:
//! the `_count` pixel every time, the `_daily` pixel only on the first
//! rejection of that pair in a UTC day.
//!
//! # Persistence
//!
//! Counters survive relaunches through a small JSON file (schema version 1).
//! Unreadable, empty or foreign-version files load as empty metrics.
//! Writes go through temp file + rename so a crash never leaves half a file.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::diagnostics::DiagnosticsSink;
use crate::error::{LifecycleError, Result};
use crate::event::EventKind;
use crate::state::StateKind;
use crate::transition::InvalidTransition;

pub const INVALID_TRANSITION_PIXEL: &str = "app_did_transition_to_unexpected_state";
pub const PARAM_APP_STATE: &str = "app_state";
pub const PARAM_APP_EVENT: &str = "app_event";

const SNAPSHOT_VERSION: u32 = 1;

/// What to fire for one recorded rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PixelEmission {
    pub state: StateKind,
    pub event: EventKind,
    /// First rejection of this pair in the current UTC day.
    pub fire_daily: bool,
    pub count_today: u64,
    pub total: u64,
}

impl PixelEmission {
    pub fn daily_pixel_name(&self) -> String {
        format!("{}_daily", INVALID_TRANSITION_PIXEL)
    }

    pub fn count_pixel_name(&self) -> String {
        format!("{}_count", INVALID_TRANSITION_PIXEL)
    }

    pub fn parameters(&self) -> [(&'static str, &'static str); 2] {
        [
            (PARAM_APP_STATE, self.state.as_str()),
            (PARAM_APP_EVENT, self.event.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounter {
    pub total: u64,
    pub daily: BTreeMap<NaiveDate, u64>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl TransitionCounter {
    fn new(at: DateTime<Utc>) -> Self {
        Self {
            total: 0,
            daily: BTreeMap::new(),
            first_seen_at: at,
            last_seen_at: at,
        }
    }

    pub fn count_on(&self, day: NaiveDate) -> u64 {
        self.daily.get(&day).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidTransitionMetrics {
    counters: BTreeMap<(StateKind, EventKind), TransitionCounter>,
}

impl InvalidTransitionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rejected: &InvalidTransition, at: DateTime<Utc>) -> PixelEmission {
        let counter = self
            .counters
            .entry((rejected.state, rejected.event))
            .or_insert_with(|| TransitionCounter::new(at));

        let today = counter.daily.entry(at.date_naive()).or_insert(0);
        *today = today.saturating_add(1);
        let count_today = *today;

        counter.total = counter.total.saturating_add(1);
        if at > counter.last_seen_at {
            counter.last_seen_at = at;
        }
        if at < counter.first_seen_at {
            counter.first_seen_at = at;
        }

        PixelEmission {
            state: rejected.state,
            event: rejected.event,
            fire_daily: count_today == 1,
            count_today,
            total: counter.total,
        }
    }

    /// Drops daily buckets older than `retention_days` before `now`.
    /// Totals are kept. A window reaching past the earliest representable
    /// date keeps every bucket.
    pub fn prune(&mut self, now: DateTime<Utc>, retention_days: u32) {
        let window = Duration::days(i64::from(retention_days));
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return;
        };
        let cutoff = cutoff.date_naive();
        for counter in self.counters.values_mut() {
            counter.daily.retain(|day, _| *day >= cutoff);
        }
    }

    pub fn get(&self, state: StateKind, event: EventKind) -> Option<&TransitionCounter> {
        self.counters.get(&(state, event))
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateKind, EventKind, &TransitionCounter)> {
        self.counters
            .iter()
            .map(|((state, event), counter)| (*state, *event, counter))
    }

    pub fn total(&self) -> u64 {
        self.counters.values().map(|counter| counter.total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            version: SNAPSHOT_VERSION,
            entries: self
                .iter()
                .map(|(state, event, counter)| MetricsEntry {
                    state,
                    event,
                    counter: counter.clone(),
                })
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: MetricsSnapshot) -> Self {
        let counters = snapshot
            .entries
            .into_iter()
            .map(|entry| ((entry.state, entry.event), entry.counter))
            .collect();
        Self { counters }
    }

    /// Loads persisted metrics, falling back to empty metrics when the file
    /// is missing or unusable. Only a failed read is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs_err::read_to_string(path).map_err(|source| LifecycleError::Io {
            context: format!("reading metrics file {}", path.display()),
            source,
        })?;

        if content.trim().is_empty() {
            tracing::warn!(path = %path.display(), "Empty metrics file, starting fresh");
            return Ok(Self::new());
        }

        match serde_json::from_str::<MetricsSnapshot>(&content) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Ok(Self::from_snapshot(snapshot)),
            Ok(snapshot) => {
                tracing::warn!(
                    version = snapshot.version,
                    expected = SNAPSHOT_VERSION,
                    "Unsupported metrics file version, starting fresh"
                );
                Ok(Self::new())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to parse metrics file, starting fresh");
                Ok(Self::new())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.snapshot()).map_err(|source| LifecycleError::Json {
                context: "serializing metrics snapshot".to_string(),
                source,
            })?;

        let parent_dir = path.parent().ok_or_else(|| LifecycleError::Io {
            context: format!("metrics path {} has no parent directory", path.display()),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        fs_err::create_dir_all(parent_dir).map_err(io_error("creating metrics directory"))?;

        let mut temp_file =
            NamedTempFile::new_in(parent_dir).map_err(io_error("creating temp metrics file"))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(io_error("writing temp metrics file"))?;
        temp_file
            .flush()
            .map_err(io_error("flushing temp metrics file"))?;
        temp_file
            .persist(path)
            .map_err(|err| io_error("persisting metrics file")(err.error))?;

        Ok(())
    }
}

fn io_error(context: &'static str) -> impl FnOnce(std::io::Error) -> LifecycleError {
    move |source| LifecycleError::Io {
        context: context.to_string(),
        source,
    }
}

/// On-disk form of [`InvalidTransitionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub version: u32,
    pub entries: Vec<MetricsEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsEntry {
    pub state: StateKind,
    pub event: EventKind,
    pub counter: TransitionCounter,
}

/// Diagnostics sink that aggregates rejections into [`InvalidTransitionMetrics`].
#[derive(Debug)]
pub struct MetricsSink {
    metrics: Mutex<InvalidTransitionMetrics>,
    retention_days: u32,
}

impl MetricsSink {
    pub fn new(metrics: InvalidTransitionMetrics, retention_days: u32) -> Self {
        Self {
            metrics: Mutex::new(metrics),
            retention_days,
        }
    }

    /// Records the rejection and returns what the host should fire.
    /// Returns `None` only if the counters are poisoned.
    pub fn record(&self, rejected: &InvalidTransition, at: DateTime<Utc>) -> Option<PixelEmission> {
        let mut metrics = self.metrics.lock().ok()?;
        let emission = metrics.record(rejected, at);
        metrics.prune(at, self.retention_days);
        tracing::debug!(
            pixel = INVALID_TRANSITION_PIXEL,
            state = emission.state.as_str(),
            event = emission.event.as_str(),
            fire_daily = emission.fire_daily,
            count_today = emission.count_today,
            "Invalid transition counted"
        );
        Some(emission)
    }

    pub fn metrics(&self) -> InvalidTransitionMetrics {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.metrics().save(path)
    }
}

impl DiagnosticsSink for MetricsSink {
    fn record_invalid_transition(&self, rejected: &InvalidTransition, at: DateTime<Utc>) {
        let _ = self.record(rejected, at);
    }
}
