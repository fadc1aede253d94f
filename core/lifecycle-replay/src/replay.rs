//! Replays recorded lifecycle callbacks through a fresh state machine.
//!
//! Input is JSON Lines, one host callback per line:
//!
//! ```text
//! {"at": "2024-05-01T09:00:00Z", "event": "launching", "application": "main"}
//! {"at": "2024-05-01T09:00:01Z", "event": "activating", "application": "main"}
//! {"event": "openURL"}
//! ```
//!
//! `at` is optional (defaults to the time the line is read). Blank lines and
//! lines starting with `#` are ignored; malformed lines are logged and skipped.

use chrono::{DateTime, Utc};
use fs_err as fs;
use lifecycle_core::{
    load_config, AppEvent, DiagnosticsSink, EventKind, FanOutSink, InvalidTransitionMetrics,
    LifecycleConfig, LifecycleError, LifecycleMachine, MemorySink, MetricsSink, StateKind,
    StorageConfig, TracingSink,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Core(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub input: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub save_metrics: bool,
}

/// One line of replay input.
#[derive(Debug, Deserialize)]
pub struct HostEvent {
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub event: AppEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayStep {
    pub line: usize,
    pub at: DateTime<Utc>,
    pub event: EventKind,
    pub from: StateKind,
    pub to: StateKind,
    pub rejected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionCount {
    pub state: StateKind,
    pub event: EventKind,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub final_state: StateKind,
    pub rejections: Vec<RejectionCount>,
}

pub fn run(options: ReplayOptions) -> Result<(), ReplayError> {
    let storage = match &options.root {
        Some(root) => StorageConfig::with_root(root.clone()),
        None => StorageConfig::from_home()?,
    };
    let config = load_config(&storage.config_file())?;

    let metrics = if options.save_metrics {
        if config.metrics.enabled && config.metrics.persist {
            let persisted = InvalidTransitionMetrics::load(&storage.metrics_file())?;
            Some(Arc::new(MetricsSink::new(
                persisted,
                config.metrics.retention_days,
            )))
        } else {
            tracing::warn!(
                enabled = config.metrics.enabled,
                persist = config.metrics.persist,
                "Metrics persistence is disabled in config, ignoring --save-metrics"
            );
            None
        }
    } else {
        None
    };

    let memory = Arc::new(MemorySink::new());
    let sink = build_sink(&config, memory.clone(), metrics.clone());
    let mut machine = LifecycleMachine::new(sink);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = match &options.input {
        Some(path) => {
            let reader = BufReader::new(fs::File::open(path)?);
            replay(reader, &mut out, &mut machine, &memory, options.json)?
        }
        None => replay(io::stdin().lock(), &mut out, &mut machine, &memory, options.json)?,
    };
    write_summary(&mut out, &summary, options.json)?;

    if let Some(metrics) = metrics {
        metrics.save(&storage.metrics_file())?;
        tracing::info!(path = %storage.metrics_file().display(), "Saved replay metrics");
    }

    Ok(())
}

/// Sinks for one replay run. `memory` always comes first so step output can
/// tell rejections apart; logging follows `[diagnostics]`.
pub fn build_sink(
    config: &LifecycleConfig,
    memory: Arc<MemorySink>,
    metrics: Option<Arc<MetricsSink>>,
) -> FanOutSink {
    let mut sink = FanOutSink::new().with(memory);
    if config.diagnostics.log_invalid_transitions {
        sink.push(Arc::new(TracingSink));
    }
    if let Some(metrics) = metrics {
        sink.push(metrics);
    }
    sink
}

/// Feeds every event in `reader` to `machine`, writing one line per step.
/// `memory` must be one of the machine's sinks; it is how rejections are seen.
pub fn replay<R, W, S>(
    reader: R,
    out: &mut W,
    machine: &mut LifecycleMachine<S>,
    memory: &MemorySink,
    json: bool,
) -> Result<ReplaySummary, ReplayError>
where
    R: BufRead,
    W: Write,
    S: DiagnosticsSink,
{
    let mut events = 0;
    let mut skipped = 0;
    let rejected_before = memory.len();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let host_event: HostEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(line = line_no, error = %err, "Skipping malformed event");
                skipped += 1;
                continue;
            }
        };

        let at = host_event.at.unwrap_or_else(Utc::now);
        let from = machine.state().kind();
        let seen = memory.len();
        let to = machine.handle_at(&host_event.event, at).kind();
        events += 1;

        let step = ReplayStep {
            line: line_no,
            at,
            event: host_event.event.kind(),
            from,
            to,
            rejected: memory.len() > seen,
        };
        write_step(out, &step, json)?;
    }

    let mut counts: BTreeMap<(StateKind, EventKind), usize> = BTreeMap::new();
    for (rejected, _) in memory.records().into_iter().skip(rejected_before) {
        *counts.entry((rejected.state, rejected.event)).or_insert(0) += 1;
    }
    let rejections: Vec<RejectionCount> = counts
        .into_iter()
        .map(|((state, event), count)| RejectionCount {
            state,
            event,
            count,
        })
        .collect();

    Ok(ReplaySummary {
        events,
        skipped,
        rejected: rejections.iter().map(|r| r.count).sum(),
        final_state: machine.state().kind(),
        rejections,
    })
}

fn write_step<W: Write>(out: &mut W, step: &ReplayStep, json: bool) -> Result<(), ReplayError> {
    if json {
        writeln!(out, "{}", serde_json::to_string(step)?)?;
        return Ok(());
    }

    let marker = if step.rejected { "  (rejected)" } else { "" };
    writeln!(
        out,
        "{:>4}  {}  {:<14} {} -> {}{}",
        step.line,
        step.at.to_rfc3339(),
        step.event.as_str(),
        step.from,
        step.to,
        marker
    )?;
    Ok(())
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a ReplaySummary,
}

fn write_summary<W: Write>(
    out: &mut W,
    summary: &ReplaySummary,
    json: bool,
) -> Result<(), ReplayError> {
    if json {
        writeln!(out, "{}", serde_json::to_string(&SummaryLine { summary })?)?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(
        out,
        "events: {}  skipped: {}  rejected: {}",
        summary.events, summary.skipped, summary.rejected
    )?;
    writeln!(out, "final state: {}", summary.final_state)?;
    for rejection in &summary.rejections {
        writeln!(
            out,
            "  rejected {} in {} x{}",
            rejection.event, rejection.state, rejection.count
        )?;
    }
    Ok(())
}
