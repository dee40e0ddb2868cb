// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::NaiveDate;
use habit_tracker::config::Config;
use habit_tracker::db::{DocumentStore, FirestoreDb, LocalStore, MemoryStore};
use habit_tracker::services::{PersistPolicy, SyncController, SyncStatus};
use habit_tracker::AppContext;
use std::time::Duration;

/// RSA key pair used to sign ID tokens in tests.
#[allow(dead_code)]
pub const TEST_SIGNING_KEY_PEM: &str = include_str!("../fixtures/test_signing_key.pem");
#[allow(dead_code)]
pub const TEST_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/test_signing_key.pub.pem");

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Generate a unique uid for test isolation.
#[allow(dead_code)]
pub fn unique_uid() -> String {
    format!("test-{}", uuid::Uuid::new_v4())
}

#[allow(dead_code)]
pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).expect("valid date")
}

/// Controller over a fresh in-memory store. The store handle is returned so
/// tests can act as another device.
#[allow(dead_code)]
pub fn memory_controller(uid: &str) -> (SyncController, MemoryStore) {
    let memory = MemoryStore::new();
    let controller = SyncController::new(
        uid,
        DocumentStore::in_memory(memory.clone()),
        PersistPolicy::default(),
    );
    (controller, memory)
}

/// App context over in-memory remote and local storage.
#[allow(dead_code)]
pub fn memory_context() -> (AppContext, MemoryStore, LocalStore) {
    let memory = MemoryStore::new();
    let local = LocalStore::in_memory();
    let ctx = AppContext::new(
        Config::default(),
        DocumentStore::in_memory(memory.clone()),
        local.clone(),
    );
    (ctx, memory, local)
}

/// Wait until the controller reports `status`.
#[allow(dead_code)]
pub async fn wait_for_status(controller: &SyncController, status: SyncStatus) {
    let mut rx = controller.watch_status();
    tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(|s| *s == status))
        .await
        .expect("timed out waiting for sync status")
        .expect("status channel closed");
}

/// Wait until `check` holds for the controller, polling on each change.
#[allow(dead_code)]
pub async fn wait_until<F>(controller: &SyncController, check: F)
where
    F: Fn(&SyncController) -> bool,
{
    let mut changes = controller.watch_changes();
    let wait = async {
        while !check(controller) {
            if changes.changed().await.is_err() {
                break;
            }
        }
    };
    tokio::time::timeout(WAIT_TIMEOUT, wait)
        .await
        .expect("timed out waiting for controller state");
}
