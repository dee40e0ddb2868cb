// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persist outbox: the single writer between local mutations and the store.
//!
//! Mutations enqueue a full `{habits, logs}` snapshot and return at once.
//! One background task drains the queue in send order, so the controller's
//! own writes can never land at the store out of order. Each snapshot
//! supersedes every older one, so when several are waiting only the newest
//! is written.
//!
//! Delivery is at-most-once per snapshot: a write that still fails after
//! `max_attempts` is logged and dropped. The next mutation writes the full
//! state again, which repairs the store if it is reachable by then.

use crate::config::Config;
use crate::db::DocumentStore;
use crate::models::UserDocument;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Upper bound for a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Retry policy for persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistPolicy {
    /// Total attempts per snapshot (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub backoff_base: Duration,
}

impl Default for PersistPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_base: Duration::from_millis(200),
        }
    }
}

impl PersistPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.persist_max_attempts.max(1),
            backoff_base: config.persist_backoff_base,
        }
    }

    /// Delay after the `failed_attempts`-th failure.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempts.saturating_sub(1));
        self.backoff_base.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Counters describing what the writer has done so far.
#[derive(Debug, Default)]
pub struct OutboxStats {
    persisted: AtomicU64,
    dropped: AtomicU64,
    superseded: AtomicU64,
}

impl OutboxStats {
    /// Snapshots written successfully.
    pub fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::SeqCst)
    }

    /// Snapshots given up on after exhausting all attempts.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Snapshots skipped because a newer one was already queued.
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::SeqCst)
    }
}

enum OutboxMessage {
    Write(UserDocument),
    Flush(oneshot::Sender<()>),
}

/// Handle to a running outbox writer.
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboxMessage>,
    task: JoinHandle<()>,
    stats: Arc<OutboxStats>,
}

impl Outbox {
    /// Start the writer for one user's document. Must be called inside a
    /// tokio runtime.
    pub fn spawn(store: DocumentStore, uid: String, policy: PersistPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(OutboxStats::default());
        let task = tokio::spawn(run_writer(store, uid, policy, rx, stats.clone()));
        Self { tx, task, stats }
    }

    /// Queue a snapshot for writing.
    pub fn enqueue(&self, doc: UserDocument) {
        if self.tx.send(OutboxMessage::Write(doc)).is_err() {
            tracing::warn!("Outbox writer stopped; dropping persist");
        }
    }

    /// Wait until every snapshot queued before this call is written or dropped.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(OutboxMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    pub fn stats(&self) -> &OutboxStats {
        &self.stats
    }

    /// Stop accepting writes, finish the queued ones, and stop the writer.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Outbox writer task failed");
        }
    }
}

async fn run_writer(
    store: DocumentStore,
    uid: String,
    policy: PersistPolicy,
    mut rx: mpsc::UnboundedReceiver<OutboxMessage>,
    stats: Arc<OutboxStats>,
) {
    while let Some(message) = rx.recv().await {
        let mut latest = None;
        let mut waiters = Vec::new();
        let mut pending = Some(message);

        // Take everything already queued; only the newest snapshot matters.
        while let Some(message) = pending.take().or_else(|| rx.try_recv().ok()) {
            match message {
                OutboxMessage::Write(doc) => {
                    if latest.replace(doc).is_some() {
                        stats.superseded.fetch_add(1, Ordering::SeqCst);
                    }
                }
                OutboxMessage::Flush(waiter) => waiters.push(waiter),
            }
        }

        if let Some(doc) = latest {
            if write_with_retry(&store, &uid, &doc, policy).await {
                stats.persisted.fetch_add(1, Ordering::SeqCst);
            } else {
                stats.dropped.fetch_add(1, Ordering::SeqCst);
            }
        }

        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    tracing::debug!(uid = %uid, "Outbox writer stopped");
}

/// Returns whether the snapshot reached the store.
async fn write_with_retry(
    store: &DocumentStore,
    uid: &str,
    doc: &UserDocument,
    policy: PersistPolicy,
) -> bool {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match store.merge_user_document(uid, doc).await {
            Ok(()) => {
                tracing::debug!(
                    uid,
                    attempt,
                    habits = doc.habits.len(),
                    "Persisted user data"
                );
                return true;
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    uid,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Persist failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(uid, attempts = attempt, error = %e, "Failed to persist user data");
            }
        }
    }

    false
}
