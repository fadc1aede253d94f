//! Renders the full state × event outcome table from the live transition
//! function, so the printed table can never drift from the code.

use chrono::{DateTime, Utc};
use lifecycle_core::{apply, AppEvent, AppState, ApplicationHandle, EventKind, StateKind};

const CELL_WIDTH: usize = 20;

pub fn run() {
    print!("{}", render(Utc::now()));
}

pub fn render(now: DateTime<Utc>) -> String {
    let mut lines = Vec::new();

    let mut header = format!("{:<CELL_WIDTH$}", "state \\ event");
    for event in EventKind::ALL {
        header.push_str(&format!("{:<CELL_WIDTH$}", event.as_str()));
    }
    lines.push(header.trim_end().to_string());

    for state_kind in StateKind::ALL {
        let mut row = format!("{:<CELL_WIDTH$}", state_kind.as_str());
        for event_kind in EventKind::ALL {
            let transition = apply(sample_state(state_kind, now), &sample_event(event_kind), now);
            let cell = match transition.rejected {
                Some(_) => "invalid".to_string(),
                None if transition.next.kind() == state_kind => "(self)".to_string(),
                None => transition.next.type_name().to_string(),
            };
            row.push_str(&format!("{:<CELL_WIDTH$}", cell));
        }
        lines.push(row.trim_end().to_string());
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

fn app() -> ApplicationHandle {
    ApplicationHandle::new("table")
}

fn sample_state(kind: StateKind, now: DateTime<Utc>) -> AppState {
    match kind {
        StateKind::Init => AppState::Init,
        StateKind::Launched => AppState::Launched {
            application: app(),
            launch_options: None,
        },
        StateKind::Active => AppState::Active { application: app() },
        StateKind::Inactive => AppState::Inactive { application: app() },
        StateKind::Background => AppState::Background {
            application: app(),
            entered_at: now,
        },
        StateKind::DoubleBackground => AppState::DoubleBackground {
            previous_entered_at: now,
            current_entered_at: now,
            counter: 0,
        },
        StateKind::InactiveBackground => AppState::InactiveBackground { application: app() },
    }
}

fn sample_event(kind: EventKind) -> AppEvent {
    match kind {
        EventKind::Launching => AppEvent::launching(app(), None),
        EventKind::Activating => AppEvent::Activating { application: app() },
        EventKind::Backgrounding => AppEvent::Backgrounding { application: app() },
        EventKind::Suspending => AppEvent::Suspending { application: app() },
        EventKind::OpenUrl => AppEvent::OpenUrl,
    }
}
