// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: the remote per-user document store and local
//! pre-authentication storage.

pub mod firestore;
pub mod local;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::UserDocument;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Collection names as constants.
pub mod collections {
    /// One document per user, keyed by uid
    pub const USERS: &str = "users";
}

/// Field paths written by a merge persist of `doc`.
///
/// `habits` is replaced whole. Logs are masked per day
/// (``logs.`2026-01-15` ``), so days another client wrote that are missing
/// from `doc` survive. An empty log map is itself a leaf and clears `logs`.
/// Everything else in the document (e.g. `createdAt`) is left untouched.
pub fn merge_field_paths(doc: &UserDocument) -> Vec<String> {
    let mut paths = vec!["habits".to_string()];
    if doc.logs.is_empty() {
        paths.push("logs".to_string());
    } else {
        paths.extend(doc.logs.days().map(|(day, _)| format!("logs.`{day}`")));
    }
    paths
}

/// Remote store holding one [`UserDocument`] per user.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreDb),
    Memory(MemoryStore),
    Offline,
}

impl DocumentStore {
    /// Connect to Firestore (or the emulator if FIRESTORE_EMULATOR_HOST is set).
    pub async fn connect(project_id: &str) -> Result<Self, AppError> {
        Ok(Self {
            backend: Backend::Firestore(FirestoreDb::new(project_id).await?),
        })
    }

    /// Store backed by an in-process [`MemoryStore`].
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            backend: Backend::Memory(store),
        }
    }

    /// Create a mock store for testing (offline mode).
    ///
    /// All operations return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    /// Read a user's document; `None` if it does not exist.
    pub async fn get_user_document(&self, uid: &str) -> Result<Option<UserDocument>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user_document(uid).await,
            Backend::Memory(store) => store.get(uid),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Write the whole document, replacing whatever was there.
    pub async fn set_user_document(&self, uid: &str, doc: &UserDocument) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.set_user_document(uid, doc).await,
            Backend::Memory(store) => store.set(uid, doc.clone()),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Write `habits` and the days present in `logs`, creating the document
    /// if needed. See [`merge_field_paths`].
    pub async fn merge_user_document(
        &self,
        uid: &str,
        doc: &UserDocument,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.merge_user_document(uid, doc).await,
            Backend::Memory(store) => store.merge(uid, doc),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Open a live subscription to a user's document.
    ///
    /// The current state is delivered first, then one event per change.
    pub async fn subscribe(&self, uid: &str) -> Result<Subscription, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.listen_user_document(uid).await,
            Backend::Memory(store) => store.subscribe(uid),
            Backend::Offline => Err(Self::offline()),
        }
    }
}

/// A change notification for a subscribed document.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Current document contents; `None` when the document does not exist.
    Snapshot(Option<UserDocument>),
    /// The listener reported an error; the subscription may still recover.
    Error(String),
}

/// A live document subscription. Dropping it without [`Subscription::close`]
/// leaves Firestore listeners running until the process exits.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<RemoteEvent>,
    handle: SubscriptionHandle,
}

pub(crate) type FirestoreListener =
    ::firestore::FirestoreListener<::firestore::FirestoreDb, ::firestore::FirestoreMemListenStateStorage>;

pub(crate) enum SubscriptionHandle {
    Firestore(Box<FirestoreListener>),
    Task(JoinHandle<()>),
}

impl Subscription {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<RemoteEvent>,
        handle: SubscriptionHandle,
    ) -> Self {
        Self { events, handle }
    }

    /// Next notification; `None` once the underlying listener has stopped.
    pub async fn next(&mut self) -> Option<RemoteEvent> {
        self.events.recv().await
    }

    /// Stop the listener.
    pub async fn close(self) {
        match self.handle {
            SubscriptionHandle::Firestore(mut listener) => {
                if let Err(e) = listener.shutdown().await {
                    tracing::warn!(error = %e, "Failed to shut down Firestore listener");
                }
            }
            SubscriptionHandle::Task(task) => task.abort(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HabitLog;
    use chrono::NaiveDate;

    #[test]
    fn merge_paths_mask_each_logged_day() {
        let mut logs = HabitLog::new();
        logs.push("a", NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        logs.push("b", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let doc = UserDocument::new(Vec::new(), logs);

        assert_eq!(
            merge_field_paths(&doc),
            ["habits", "logs.`2026-01-01`", "logs.`2026-01-02`"]
        );
    }

    #[test]
    fn merge_paths_clear_logs_when_empty() {
        let doc = UserDocument::new(Vec::new(), HabitLog::new());
        assert_eq!(merge_field_paths(&doc), ["habits", "logs"]);
    }
}
