// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync controller: local habit state kept in step with the user's document.
//!
//! Handles:
//! - Optimistic local mutations (add, delete, toggle), each followed by a
//!   persist through the [`Outbox`]
//! - A live subscription whose notifications replace local state wholesale
//!   (last-writer-wins; a stale echo can briefly revert a newer local edit)
//! - One-time migration of pre-authentication local data on sign-in
//!
//! Every remote failure is logged here and never returned to the caller.

use crate::db::{DocumentStore, LocalStore, RemoteEvent};
use crate::error::Result;
use crate::models::{Habit, HabitLog, NewHabit, UserDocument, UserStats};
use crate::services::outbox::{Outbox, OutboxStats, PersistPolicy};
use crate::time_utils::now_iso8601;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use validator::Validate;

/// Connection state of the live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Waiting for the first notification
    Loading,
    /// Local state reflects the latest notification (plus local edits)
    Synced,
    /// The subscription failed or ended; local edits are still persisted
    Offline,
}

/// Result of the sign-in migration of local data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No local data was stored before sign-in
    NothingToMigrate,
    /// Local data became the user's first remote document
    Uploaded { habits: usize },
    /// A remote document already existed; local data was discarded
    SkippedRemoteExists,
    /// The attempt failed; local data was discarded anyway
    Failed(String),
}

#[derive(Debug, Default)]
struct SyncState {
    habits: Vec<Habit>,
    logs: HabitLog,
}

impl SyncState {
    fn to_document(&self) -> UserDocument {
        UserDocument::new(self.habits.clone(), self.logs.clone())
    }

    fn adjust_streak(&mut self, habit_id: &str, completed: bool) {
        if let Some(habit) = self.habits.iter_mut().find(|h| h.id == habit_id) {
            habit.streak = if completed {
                habit.streak.saturating_add(1)
            } else {
                habit.streak.saturating_sub(1)
            };
        }
    }
}

struct SubscriptionTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owner of one signed-in user's `habits` and `logs`.
pub struct SyncController {
    uid: String,
    store: DocumentStore,
    state: Arc<RwLock<SyncState>>,
    status: Arc<watch::Sender<SyncStatus>>,
    revision: Arc<watch::Sender<u64>>,
    outbox: Outbox,
    subscription: Option<SubscriptionTask>,
}

impl SyncController {
    /// Create a controller with empty state. Must be called inside a tokio
    /// runtime (the outbox writer starts immediately).
    pub fn new(uid: impl Into<String>, store: DocumentStore, policy: PersistPolicy) -> Self {
        let uid = uid.into();
        let outbox = Outbox::spawn(store.clone(), uid.clone(), policy);
        Self {
            uid,
            store,
            state: Arc::new(RwLock::new(SyncState::default())),
            status: Arc::new(watch::channel(SyncStatus::Loading).0),
            revision: Arc::new(watch::channel(0).0),
            outbox,
            subscription: None,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    // ─── Session Start ───────────────────────────────────────────

    /// Upload local pre-authentication data if the user has no remote
    /// document yet, otherwise discard it. Local storage is cleared in every
    /// case and the attempt is never retried.
    pub async fn migrate_local_data(&self, local: &LocalStore) -> MigrationOutcome {
        let data = match local.load().await {
            Ok(Some(data)) => data,
            Ok(None) => return MigrationOutcome::NothingToMigrate,
            Err(e) => {
                tracing::error!(uid = %self.uid, error = %e, "Failed to read local data");
                clear_local(local, &self.uid).await;
                return MigrationOutcome::Failed(e.to_string());
            }
        };

        let outcome = match self.store.get_user_document(&self.uid).await {
            Ok(None) => {
                let habits = data.habits.len();
                let doc = UserDocument {
                    habits: data.habits,
                    logs: data.logs,
                    created_at: Some(now_iso8601()),
                };
                match self.store.set_user_document(&self.uid, &doc).await {
                    Ok(()) => {
                        tracing::info!(uid = %self.uid, habits, "Migrated local data to cloud");
                        MigrationOutcome::Uploaded { habits }
                    }
                    Err(e) => {
                        tracing::error!(uid = %self.uid, error = %e, "Sync error during migration");
                        MigrationOutcome::Failed(e.to_string())
                    }
                }
            }
            Ok(Some(_)) => {
                tracing::info!(
                    uid = %self.uid,
                    "Remote document exists, discarding local data"
                );
                MigrationOutcome::SkippedRemoteExists
            }
            Err(e) => {
                tracing::error!(uid = %self.uid, error = %e, "Sync error during migration");
                MigrationOutcome::Failed(e.to_string())
            }
        };

        clear_local(local, &self.uid).await;
        outcome
    }

    /// Open the live subscription. A failure is logged and leaves the
    /// controller `Offline`; local edits keep being persisted.
    pub async fn start_subscription(&mut self) {
        self.stop_subscription().await;
        self.status.send_replace(SyncStatus::Loading);

        let mut subscription = match self.store.subscribe(&self.uid).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!(uid = %self.uid, error = %e, "Subscription error");
                self.status.send_replace(SyncStatus::Offline);
                return;
            }
        };

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let uid = self.uid.clone();
        let state = self.state.clone();
        let status = self.status.clone();
        let revision = self.revision.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Fires on an explicit stop and when the controller is dropped.
                    _ = &mut shutdown_rx => break,
                    event = subscription.next() => match event {
                        Some(RemoteEvent::Snapshot(doc)) => {
                            let doc = doc.unwrap_or_default();
                            tracing::debug!(
                                uid = %uid,
                                habits = doc.habits.len(),
                                "Applying remote snapshot"
                            );
                            {
                                let mut state = write_lock(&state);
                                state.habits = doc.habits;
                                state.logs = doc.logs;
                            }
                            status.send_replace(SyncStatus::Synced);
                            revision.send_modify(|r| *r += 1);
                        }
                        Some(RemoteEvent::Error(e)) => {
                            tracing::error!(uid = %uid, error = %e, "Subscription error");
                            status.send_replace(SyncStatus::Offline);
                        }
                        None => {
                            tracing::warn!(uid = %uid, "Subscription ended");
                            status.send_replace(SyncStatus::Offline);
                            break;
                        }
                    },
                }
            }
            subscription.close().await;
        });

        self.subscription = Some(SubscriptionTask {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Close the subscription, if open. No notification is applied after
    /// this returns.
    pub async fn stop_subscription(&mut self) {
        if let Some(task) = self.subscription.take() {
            let _ = task.shutdown.send(());
            if let Err(e) = task.handle.await {
                tracing::error!(uid = %self.uid, error = %e, "Subscription task failed");
            }
            tracing::debug!(uid = %self.uid, "Subscription closed");
        }
    }

    // ─── Local Mutations ─────────────────────────────────────────

    /// Create a habit and persist. Fails only on invalid input.
    pub fn add_habit(&self, input: NewHabit) -> Result<Habit> {
        let input = input.normalized();
        input.validate()?;

        let habit = input.into_habit(now_iso8601());
        let doc = {
            let mut state = write_lock(&self.state);
            state.habits.push(habit.clone());
            state.to_document()
        };
        tracing::info!(uid = %self.uid, habit_id = %habit.id, name = %habit.name, "Habit added");
        self.commit(doc);
        Ok(habit)
    }

    /// Remove a habit and persist. Log entries for it are kept.
    ///
    /// Returns whether a habit with that id existed.
    pub fn delete_habit(&self, habit_id: &str) -> bool {
        let (removed, doc) = {
            let mut state = write_lock(&self.state);
            let before = state.habits.len();
            state.habits.retain(|h| h.id != habit_id);
            (state.habits.len() != before, state.to_document())
        };
        tracing::info!(uid = %self.uid, habit_id, removed, "Habit deleted");
        self.commit(doc);
        removed
    }

    /// Flip completion of a habit on `date` and persist.
    ///
    /// Completing appends the id and increments the streak; un-completing
    /// removes the id and decrements the streak (never below zero).
    /// Returns the new completion state.
    pub fn toggle_habit(&self, habit_id: &str, date: NaiveDate) -> bool {
        let (completed, doc) = {
            let mut state = write_lock(&self.state);
            let completed = !state.logs.is_completed(habit_id, date);
            if completed {
                state.logs.push(habit_id, date);
            } else {
                state.logs.remove(habit_id, date);
            }
            state.adjust_streak(habit_id, completed);
            (completed, state.to_document())
        };
        tracing::debug!(uid = %self.uid, habit_id, %date, completed, "Habit toggled");
        self.commit(doc);
        completed
    }

    /// Record a completion without checking membership first.
    ///
    /// Not idempotent: calling it for a habit already completed on `date`
    /// appends a duplicate id and increments the streak again. Callers that
    /// want toggle semantics must check [`Self::is_completed`] or use
    /// [`Self::toggle_habit`].
    pub fn complete_habit(&self, habit_id: &str, date: NaiveDate) {
        let doc = {
            let mut state = write_lock(&self.state);
            state.logs.push(habit_id, date);
            state.adjust_streak(habit_id, true);
            state.to_document()
        };
        self.commit(doc);
    }

    /// Queue a write of the current `{habits, logs}`.
    pub fn persist(&self) {
        let doc = read_lock(&self.state).to_document();
        self.outbox.enqueue(doc);
    }

    fn commit(&self, doc: UserDocument) {
        self.revision.send_modify(|r| *r += 1);
        self.outbox.enqueue(doc);
    }

    // ─── Read Accessors ──────────────────────────────────────────

    pub fn habits(&self) -> Vec<Habit> {
        read_lock(&self.state).habits.clone()
    }

    pub fn habit(&self, habit_id: &str) -> Option<Habit> {
        read_lock(&self.state)
            .habits
            .iter()
            .find(|h| h.id == habit_id)
            .cloned()
    }

    pub fn logs(&self) -> HabitLog {
        read_lock(&self.state).logs.clone()
    }

    /// Current `{habits, logs}` as a document.
    pub fn snapshot(&self) -> UserDocument {
        read_lock(&self.state).to_document()
    }

    pub fn is_completed(&self, habit_id: &str, date: NaiveDate) -> bool {
        read_lock(&self.state).logs.is_completed(habit_id, date)
    }

    /// Stats derived from the current logs.
    pub fn stats(&self) -> UserStats {
        UserStats::from_logs(&read_lock(&self.state).logs)
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Receiver that changes on every local mutation and remote snapshot.
    pub fn watch_changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn outbox_stats(&self) -> &OutboxStats {
        self.outbox.stats()
    }

    /// Wait for every persist queued so far to finish.
    pub async fn flush(&self) {
        self.outbox.flush().await;
    }

    /// Close the subscription and drain the outbox.
    pub async fn shutdown(mut self) {
        self.stop_subscription().await;
        self.outbox.close().await;
        tracing::info!(uid = %self.uid, "Sync controller stopped");
    }
}

async fn clear_local(local: &LocalStore, uid: &str) {
    if let Err(e) = local.clear().await {
        tracing::warn!(uid, error = %e, "Failed to clear local data");
    }
}

fn read_lock(state: &RwLock<SyncState>) -> RwLockReadGuard<'_, SyncState> {
    state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock(state: &RwLock<SyncState>) -> RwLockWriteGuard<'_, SyncState> {
    state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
