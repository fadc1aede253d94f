//! Lifecycle events delivered by the host OS.
//!
//! The string names returned by [`EventKind::as_str`] are stable: they end up in
//! logs and metric parameters. Control flow always matches on the enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LifecycleError;
use crate::types::{ApplicationHandle, LaunchOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum AppEvent {
    Launching {
        application: ApplicationHandle,
        #[serde(default)]
        launch_options: Option<LaunchOptions>,
    },
    Activating {
        application: ApplicationHandle,
    },
    Backgrounding {
        application: ApplicationHandle,
    },
    Suspending {
        application: ApplicationHandle,
    },
    #[serde(rename = "openURL")]
    OpenUrl,
}

impl AppEvent {
    pub fn launching(application: ApplicationHandle, launch_options: Option<LaunchOptions>) -> Self {
        AppEvent::Launching {
            application,
            launch_options,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::Launching { .. } => EventKind::Launching,
            AppEvent::Activating { .. } => EventKind::Activating,
            AppEvent::Backgrounding { .. } => EventKind::Backgrounding,
            AppEvent::Suspending { .. } => EventKind::Suspending,
            AppEvent::OpenUrl => EventKind::OpenUrl,
        }
    }

    /// Stable diagnostic name of this event.
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Payload-free discriminant of [`AppEvent`], used as a metrics key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "launching")]
    Launching,
    #[serde(rename = "activating")]
    Activating,
    #[serde(rename = "backgrounding")]
    Backgrounding,
    #[serde(rename = "suspending")]
    Suspending,
    #[serde(rename = "openURL")]
    OpenUrl,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Launching,
        EventKind::Activating,
        EventKind::Backgrounding,
        EventKind::Suspending,
        EventKind::OpenUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Launching => "launching",
            EventKind::Activating => "activating",
            EventKind::Backgrounding => "backgrounding",
            EventKind::Suspending => "suspending",
            EventKind::OpenUrl => "openURL",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = LifecycleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| LifecycleError::UnknownEvent(value.to_string()))
    }
}
