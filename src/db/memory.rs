// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store with change notifications.
//!
//! Behaves like the Firestore backend (merge writes, notify every
//! subscriber on each write) so controller logic can run without an
//! emulator. Cloned handles share the same documents, which lets tests play
//! "another device" against a running controller.

use crate::db::{RemoteEvent, Subscription, SubscriptionHandle};
use crate::error::AppError;
use crate::models::{HabitLog, UserDocument};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

const CHANNEL_CAPACITY: usize = 64;

/// Shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    documents: DashMap<String, UserDocument>,
    channels: DashMap<String, broadcast::Sender<Option<UserDocument>>>,
    /// Number of upcoming writes that should fail
    failing_writes: AtomicU32,
    /// Successful writes, for assertions
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uid: &str) -> Result<Option<UserDocument>, AppError> {
        Ok(self.inner.documents.get(uid).map(|doc| doc.clone()))
    }

    /// Replace the document and notify subscribers.
    pub fn set(&self, uid: &str, doc: UserDocument) -> Result<(), AppError> {
        self.take_injected_failure()?;
        self.inner.documents.insert(uid.to_string(), doc.clone());
        self.record_write(uid, Some(doc));
        Ok(())
    }

    /// Merge write with the same field semantics as Firestore
    /// ([`merge_field_paths`](crate::db::merge_field_paths)); notify subscribers.
    pub fn merge(&self, uid: &str, doc: &UserDocument) -> Result<(), AppError> {
        self.take_injected_failure()?;
        let merged = {
            let mut entry = self.inner.documents.entry(uid.to_string()).or_default();
            entry.habits = doc.habits.clone();
            if doc.logs.is_empty() {
                entry.logs = HabitLog::new();
            } else {
                entry.logs.merge_days(&doc.logs);
            }
            entry.clone()
        };
        self.record_write(uid, Some(merged));
        Ok(())
    }

    /// Delete the document and notify subscribers.
    pub fn delete(&self, uid: &str) {
        self.inner.documents.remove(uid);
        self.notify(uid, None);
    }

    /// Make the next `n` writes fail with a database error.
    pub fn fail_next_writes(&self, n: u32) {
        self.inner.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions to a user's document.
    pub fn subscriber_count(&self, uid: &str) -> usize {
        self.inner
            .channels
            .get(uid)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    pub fn subscribe(&self, uid: &str) -> Result<Subscription, AppError> {
        // Subscribe before reading so no write can fall between the two.
        let mut changes = self.channel(uid).subscribe();
        let initial = self.get(uid)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(RemoteEvent::Snapshot(initial));

        let uid = uid.to_string();
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(doc) => {
                        if tx.send(RemoteEvent::Snapshot(doc)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(uid = %uid, missed, "Subscriber lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx, SubscriptionHandle::Task(task)))
    }

    fn channel(&self, uid: &str) -> broadcast::Sender<Option<UserDocument>> {
        self.inner
            .channels
            .entry(uid.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn take_injected_failure(&self) -> Result<(), AppError> {
        let injected = self
            .inner
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AppError::Database("injected write failure".to_string()));
        }
        Ok(())
    }

    fn record_write(&self, uid: &str, doc: Option<UserDocument>) {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.notify(uid, doc);
    }

    fn notify(&self, uid: &str, doc: Option<UserDocument>) {
        // No receivers is fine: nobody is subscribed to this user.
        let _ = self.channel(uid).send(doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Icon, NewHabit};
    use chrono::NaiveDate;

    fn doc_with(name: &str) -> UserDocument {
        let habit = NewHabit::new(name, Category::Other, Icon::Zap).into_habit(String::new());
        UserDocument::new(vec![habit], HabitLog::new())
    }

    #[test]
    fn merge_keeps_created_at() {
        let store = MemoryStore::new();
        let mut initial = doc_with("Walk");
        initial.created_at = Some("2026-01-01T00:00:00.000Z".to_string());
        store.set("u1", initial).unwrap();

        store.merge("u1", &doc_with("Run")).unwrap();

        let stored = store.get("u1").unwrap().unwrap();
        assert_eq!(stored.habits[0].name, "Run");
        assert_eq!(stored.created_at.as_deref(), Some("2026-01-01T00:00:00.000Z"));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn merge_keeps_days_the_writer_did_not_send() {
        let store = MemoryStore::new();
        let mut remote = HabitLog::new();
        remote.push("a", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        store
            .set("u1", UserDocument::new(Vec::new(), remote))
            .unwrap();

        let mut stale = HabitLog::new();
        stale.push("b", NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        store
            .merge("u1", &UserDocument::new(Vec::new(), stale))
            .unwrap();

        let logs = store.get("u1").unwrap().unwrap().logs;
        assert_eq!(logs.completed_on_key("2026-01-01"), ["a".to_string()]);
        assert_eq!(logs.completed_on_key("2026-01-02"), ["b".to_string()]);
    }

    #[test]
    fn injected_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_writes(1);
        assert!(store.merge("u1", &doc_with("A")).is_err());
        assert!(store.merge("u1", &doc_with("A")).is_ok());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn subscription_sees_initial_state_then_changes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("u1").unwrap();

        assert_eq!(sub.next().await, Some(RemoteEvent::Snapshot(None)));

        store.set("u1", doc_with("Read")).unwrap();
        match sub.next().await {
            Some(RemoteEvent::Snapshot(Some(doc))) => assert_eq!(doc.habits[0].name, "Read"),
            other => panic!("unexpected event: {other:?}"),
        }

        store.delete("u1");
        assert_eq!(sub.next().await, Some(RemoteEvent::Snapshot(None)));
        sub.close().await;
    }
}
