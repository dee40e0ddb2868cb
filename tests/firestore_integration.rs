// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Start it with `gcloud emulators firestore start` and export
//! FIRESTORE_EMULATOR_HOST before running `cargo test`.
//!
//! The emulator provides a clean state for each test run.

use habit_tracker::db::{DocumentStore, RemoteEvent};
use habit_tracker::models::{Category, HabitLog, Icon, Identity, NewHabit, UserDocument};
use habit_tracker::services::{PersistPolicy, SyncController, SyncStatus};
use std::time::Duration;

mod common;
use common::{day, test_db, unique_uid, wait_for_status, wait_until};

fn sample_document() -> UserDocument {
    let habit = NewHabit::new("Read", Category::Learning, Icon::Book)
        .with_description("Ten pages")
        .into_habit("2026-01-15T10:00:00.000Z".to_string());
    let mut logs = HabitLog::new();
    logs.push(&habit.id, day(2026, 1, 15));
    UserDocument {
        habits: vec![habit],
        logs,
        created_at: Some("2026-01-15T10:00:00.000Z".to_string()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DOCUMENT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_document_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid();

    let before = db.get_user_document(&uid).await.unwrap();
    assert!(before.is_none(), "Document should not exist before creation");

    let doc = sample_document();
    db.set_user_document(&uid, &doc).await.unwrap();

    let fetched = db.get_user_document(&uid).await.unwrap().unwrap();
    assert_eq!(fetched, doc);

    println!("✓ User document stored and read back: uid={}", uid);
}

#[tokio::test]
async fn test_merge_preserves_created_at() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid();

    db.set_user_document(&uid, &sample_document()).await.unwrap();

    let replacement = UserDocument::new(
        vec![NewHabit::new("Walk", Category::Health, Icon::Footprints)
            .into_habit("2026-01-16T10:00:00.000Z".to_string())],
        HabitLog::new(),
    );
    db.merge_user_document(&uid, &replacement).await.unwrap();

    let fetched = db.get_user_document(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.habits, replacement.habits);
    assert!(fetched.logs.is_empty());
    assert_eq!(
        fetched.created_at.as_deref(),
        Some("2026-01-15T10:00:00.000Z")
    );

    println!("✓ Merge kept createdAt: uid={}", uid);
}

#[tokio::test]
async fn test_merge_keeps_days_missing_from_writer() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid();

    let doc = sample_document();
    db.set_user_document(&uid, &doc).await.unwrap();

    // A device whose cache predates 2026-01-15 logs a later day
    let mut stale_logs = HabitLog::new();
    stale_logs.push(&doc.habits[0].id, day(2026, 1, 16));
    db.merge_user_document(&uid, &UserDocument::new(doc.habits.clone(), stale_logs))
        .await
        .unwrap();

    let fetched = db.get_user_document(&uid).await.unwrap().unwrap();
    assert!(fetched.logs.is_completed(&doc.habits[0].id, day(2026, 1, 15)));
    assert!(fetched.logs.is_completed(&doc.habits[0].id, day(2026, 1, 16)));
}

#[tokio::test]
async fn test_merge_creates_missing_document() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid();

    let doc = UserDocument::new(Vec::new(), HabitLog::new());
    db.merge_user_document(&uid, &doc).await.unwrap();

    let fetched = db.get_user_document(&uid).await.unwrap();
    assert!(fetched.is_some(), "Merge should upsert");
    assert_eq!(fetched.unwrap().created_at, None);
}

// ═══════════════════════════════════════════════════════════════════════════
// LISTENER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_listener_reports_absent_then_written_document() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid();

    let mut subscription = db.listen_user_document(&uid).await.unwrap();
    assert_eq!(subscription.next().await, Some(RemoteEvent::Snapshot(None)));

    let doc = sample_document();
    db.set_user_document(&uid, &doc).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(10), subscription.next())
        .await
        .expect("listener should report the write");
    assert_eq!(event, Some(RemoteEvent::Snapshot(Some(doc))));

    subscription.close().await;
}

#[tokio::test]
async fn test_controller_syncs_through_emulator() {
    require_emulator!();

    let store = DocumentStore::connect("test-project").await.unwrap();
    let identity = Identity::new(unique_uid());

    let mut controller =
        SyncController::new(identity.uid.clone(), store.clone(), PersistPolicy::default());
    controller.start_subscription().await;
    wait_for_status(&controller, SyncStatus::Synced).await;

    let habit = controller
        .add_habit(NewHabit::new("Meditate", Category::Mindfulness, Icon::Brain))
        .unwrap();
    controller.toggle_habit(&habit.id, day(2026, 2, 1));
    controller.flush().await;

    let stored = store
        .get_user_document(&identity.uid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.habits[0].streak, 1);

    // Another device clears the habits
    store
        .set_user_document(&identity.uid, &UserDocument::default())
        .await
        .unwrap();
    wait_until(&controller, |c| c.habits().is_empty()).await;

    controller.shutdown().await;
    println!("✓ Controller synced via emulator: uid={}", identity.uid);
}
