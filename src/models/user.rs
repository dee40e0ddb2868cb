//! User identity and the per-user store document.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Habit, HabitLog};

/// Authenticated identity, as returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id (also used as document ID)
    pub uid: String,
    pub display_name: Option<String>,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Profile picture URL
    pub photo_url: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    /// First word of the display name, for greetings.
    pub fn first_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
    }
}

/// The single document stored per user at `users/{uid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserDocument {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub logs: HabitLog,
    /// Set once when the document is first created by a migration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserDocument {
    pub fn new(habits: Vec<Habit>, logs: HabitLog) -> Self {
        Self {
            habits,
            logs,
            created_at: None,
        }
    }
}

/// Data written to local storage before the user signed in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalData {
    #[serde(rename = "t2sar_habits")]
    pub habits: Vec<Habit>,
    #[serde(rename = "t2sar_logs", default)]
    pub logs: HabitLog,
}
