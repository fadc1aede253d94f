//! Prints persisted invalid-transition metrics.

use chrono::{NaiveDate, Utc};
use lifecycle_core::{InvalidTransitionMetrics, StorageConfig};
use std::path::PathBuf;

use crate::replay::ReplayError;

pub fn run(file: Option<PathBuf>) -> Result<(), ReplayError> {
    let path = match file {
        Some(path) => path,
        None => StorageConfig::from_home()?.metrics_file(),
    };
    let metrics = InvalidTransitionMetrics::load(&path)?;
    println!("Metrics file: {}", path.display());
    print!("{}", render(&metrics, Utc::now().date_naive()));
    Ok(())
}

pub fn render(metrics: &InvalidTransitionMetrics, today: NaiveDate) -> String {
    if metrics.is_empty() {
        return "  (no invalid transitions recorded)\n".to_string();
    }

    let mut output = format!(
        "{:<20}{:<16}{:>8}{:>8}  {}\n",
        "state", "event", "today", "total", "last seen"
    );
    for (state, event, counter) in metrics.iter() {
        output.push_str(&format!(
            "{:<20}{:<16}{:>8}{:>8}  {}\n",
            state.as_str(),
            event.as_str(),
            counter.count_on(today),
            counter.total,
            counter.last_seen_at.to_rfc3339()
        ));
    }
    output.push_str(&format!("total: {}\n", metrics.total()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lifecycle_core::{EventKind, InvalidTransition, StateKind};

    #[test]
    fn test_render_empty_metrics() {
        let metrics = InvalidTransitionMetrics::new();
        let today = Utc::now().date_naive();
        assert!(render(&metrics, today).contains("no invalid transitions"));
    }

    #[test]
    fn test_render_lists_each_pair() {
        let mut metrics = InvalidTransitionMetrics::new();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let rejected = InvalidTransition {
            state: StateKind::Active,
            event: EventKind::Launching,
        };
        metrics.record(&rejected, at);
        metrics.record(&rejected, at);

        let text = render(&metrics, at.date_naive());
        let row = text
            .lines()
            .find(|line| line.starts_with("Active"))
            .unwrap();
        let columns: Vec<_> = row.split_whitespace().collect();
        assert_eq!(&columns[..4], &["Active", "launching", "2", "2"]);
        assert!(text.ends_with("total: 2\n"));
    }
}
