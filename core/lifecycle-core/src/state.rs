//! Application lifecycle states.
//!
//! Each variant carries only what the host needs once the state is reached.
//! Background timestamps are UTC instants at which the OS reported the
//! app entering the background.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ApplicationHandle, LaunchOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum AppState {
    /// Process started, no lifecycle event seen yet.
    #[default]
    Init,
    Launched {
        application: ApplicationHandle,
        launch_options: Option<LaunchOptions>,
    },
    Active {
        application: ApplicationHandle,
    },
    /// Losing focus but still resident.
    Inactive {
        application: ApplicationHandle,
    },
    Background {
        application: ApplicationHandle,
        entered_at: DateTime<Utc>,
    },
    /// Backgrounded again without passing through Active/Inactive.
    DoubleBackground {
        previous_entered_at: DateTime<Utc>,
        current_entered_at: DateTime<Utc>,
        counter: u32,
    },
    /// Backgrounded straight from launch, never activated.
    InactiveBackground {
        application: ApplicationHandle,
    },
}

impl AppState {
    pub fn kind(&self) -> StateKind {
        match self {
            AppState::Init => StateKind::Init,
            AppState::Launched { .. } => StateKind::Launched,
            AppState::Active { .. } => StateKind::Active,
            AppState::Inactive { .. } => StateKind::Inactive,
            AppState::Background { .. } => StateKind::Background,
            AppState::DoubleBackground { .. } => StateKind::DoubleBackground,
            AppState::InactiveBackground { .. } => StateKind::InactiveBackground,
        }
    }

    /// Type name reported when this state rejects an event.
    pub fn type_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// The application handle, for states that carry one.
    pub fn application(&self) -> Option<&ApplicationHandle> {
        match self {
            AppState::Launched { application, .. }
            | AppState::Active { application }
            | AppState::Inactive { application }
            | AppState::Background { application, .. }
            | AppState::InactiveBackground { application } => Some(application),
            AppState::Init | AppState::DoubleBackground { .. } => None,
        }
    }
}

/// Payload-free discriminant of [`AppState`], used as a metrics key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateKind {
    Init,
    Launched,
    Active,
    Inactive,
    Background,
    DoubleBackground,
    InactiveBackground,
}

impl StateKind {
    pub const ALL: [StateKind; 7] = [
        StateKind::Init,
        StateKind::Launched,
        StateKind::Active,
        StateKind::Inactive,
        StateKind::Background,
        StateKind::DoubleBackground,
        StateKind::InactiveBackground,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Init => "Init",
            StateKind::Launched => "Launched",
            StateKind::Active => "Active",
            StateKind::Inactive => "Inactive",
            StateKind::Background => "Background",
            StateKind::DoubleBackground => "DoubleBackground",
            StateKind::InactiveBackground => "InactiveBackground",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
