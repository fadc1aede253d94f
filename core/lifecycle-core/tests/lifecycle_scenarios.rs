//! End-to-end lifecycle sequences driven through `LifecycleMachine`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use lifecycle_core::{
    apply, AppEvent, AppState, ApplicationHandle, EventKind, InvalidTransition,
    InvalidTransitionMetrics, LifecycleMachine, MemorySink, MetricsSink, StateKind,
};

fn app() -> ApplicationHandle {
    ApplicationHandle::new("main")
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 3, 7, 30, 0).unwrap()
}

fn event(kind: EventKind) -> AppEvent {
    match kind {
        EventKind::Launching => AppEvent::launching(app(), None),
        EventKind::Activating => AppEvent::Activating { application: app() },
        EventKind::Backgrounding => AppEvent::Backgrounding { application: app() },
        EventKind::Suspending => AppEvent::Suspending { application: app() },
        EventKind::OpenUrl => AppEvent::OpenUrl,
    }
}

#[test]
fn test_cold_launch_to_background_path() {
    let mut machine = LifecycleMachine::new(MemorySink::new());

    assert_eq!(
        machine.handle_at(&event(EventKind::Launching), t0()),
        &AppState::Launched {
            application: app(),
            launch_options: None,
        }
    );
    assert_eq!(
        machine.handle_at(&event(EventKind::Activating), t0()),
        &AppState::Active { application: app() }
    );

    // Backgrounding straight from Active is rejected; the OS suspends first.
    assert_eq!(
        machine.handle_at(&event(EventKind::Backgrounding), t0()),
        &AppState::Active { application: app() }
    );

    assert_eq!(
        machine.handle_at(&event(EventKind::Suspending), t0()),
        &AppState::Inactive { application: app() }
    );
    let entered_at = t0() + Duration::seconds(2);
    assert_eq!(
        machine.handle_at(&event(EventKind::Backgrounding), entered_at),
        &AppState::Background {
            application: app(),
            entered_at,
        }
    );

    assert_eq!(
        machine.sink().records(),
        vec![(
            InvalidTransition {
                state: StateKind::Active,
                event: EventKind::Backgrounding,
            },
            t0()
        )]
    );
}

#[test]
fn test_inactive_background_only_reachable_from_launched() {
    let mut machine = LifecycleMachine::new(MemorySink::new());
    machine.handle_at(&event(EventKind::Launching), t0());
    machine.handle_at(&event(EventKind::Backgrounding), t0());
    assert_eq!(machine.state().kind(), StateKind::InactiveBackground);

    // Resume via activation, then walk the regular path back to background.
    machine.handle_at(&event(EventKind::Activating), t0());
    machine.handle_at(&event(EventKind::Suspending), t0());
    machine.handle_at(&event(EventKind::Backgrounding), t0());
    assert_eq!(machine.state().kind(), StateKind::Background);
    assert!(machine.sink().is_empty());
}

#[test]
fn test_repeated_backgrounding_keeps_first_timestamp() {
    let mut machine = LifecycleMachine::new(MemorySink::new());
    machine.handle_at(&event(EventKind::Launching), t0());
    machine.handle_at(&event(EventKind::Activating), t0());
    machine.handle_at(&event(EventKind::Suspending), t0());

    let first = t0() + Duration::minutes(1);
    let second = t0() + Duration::minutes(5);
    let third = t0() + Duration::minutes(9);
    machine.handle_at(&event(EventKind::Backgrounding), first);
    machine.handle_at(&event(EventKind::Backgrounding), second);
    assert_eq!(
        machine.state(),
        &AppState::DoubleBackground {
            previous_entered_at: first,
            current_entered_at: second,
            counter: 0,
        }
    );

    machine.handle_at(&event(EventKind::Backgrounding), third);
    assert_eq!(
        machine.state(),
        &AppState::DoubleBackground {
            previous_entered_at: first,
            current_entered_at: third,
            counter: 0,
        }
    );

    machine.handle_at(&event(EventKind::Suspending), third);
    assert_eq!(machine.state(), &AppState::Inactive { application: app() });
}

#[test]
fn test_every_rejection_reports_exactly_once_with_names() {
    let states = [
        AppState::Init,
        AppState::Launched {
            application: app(),
            launch_options: None,
        },
        AppState::Active { application: app() },
        AppState::Inactive { application: app() },
        AppState::Background {
            application: app(),
            entered_at: t0(),
        },
        AppState::DoubleBackground {
            previous_entered_at: t0(),
            current_entered_at: t0(),
            counter: 1,
        },
        AppState::InactiveBackground { application: app() },
    ];

    for state in states {
        for kind in EventKind::ALL {
            let transition = apply(state.clone(), &event(kind), t0());
            let mut machine = LifecycleMachine::with_state(state.clone(), MemorySink::new());
            machine.handle_at(&event(kind), t0());

            match transition.rejected {
                Some(rejected) => {
                    assert_eq!(machine.state(), &state);
                    let records = machine.sink().records();
                    assert_eq!(records.len(), 1);
                    assert_eq!(records[0].0.event_name(), kind.as_str());
                    assert_eq!(records[0].0.state_type_name(), state.type_name());
                    assert_eq!(records[0].0, rejected);
                }
                None => assert!(machine.sink().is_empty()),
            }
        }
    }
}

#[test]
fn test_metrics_sink_aggregates_machine_rejections() {
    let mut machine =
        LifecycleMachine::new(MetricsSink::new(InvalidTransitionMetrics::new(), 30));

    machine.handle_at(&AppEvent::OpenUrl, t0());
    machine.handle_at(&AppEvent::OpenUrl, t0() + Duration::hours(1));
    machine.handle_at(&event(EventKind::Suspending), t0());

    let metrics = machine.sink().metrics();
    assert_eq!(metrics.total(), 3);
    assert_eq!(
        metrics
            .get(StateKind::Init, EventKind::OpenUrl)
            .map(|counter| counter.count_on(t0().date_naive())),
        Some(2)
    );
}
