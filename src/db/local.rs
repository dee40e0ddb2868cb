// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local storage for data created before the user signed in.
//!
//! The file holds a flat key/value object with the `t2sar_habits` and
//! `t2sar_logs` keys. The data is transient: it is uploaded (or discarded)
//! and cleared by the first sign-in.

use crate::error::AppError;
use crate::models::LocalData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const LOCAL_STORAGE_FILE: &str = "local_storage.json";

/// Pre-authentication storage.
#[derive(Clone)]
pub struct LocalStore {
    backend: LocalBackend,
}

#[derive(Clone)]
enum LocalBackend {
    File(PathBuf),
    Memory(Arc<Mutex<Option<LocalData>>>),
}

impl LocalStore {
    /// File-backed storage inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            backend: LocalBackend::File(dir.as_ref().join(LOCAL_STORAGE_FILE)),
        }
    }

    /// In-process storage, for tests.
    pub fn in_memory() -> Self {
        Self {
            backend: LocalBackend::Memory(Arc::new(Mutex::new(None))),
        }
    }

    /// Read local data; `None` when no habits were ever stored locally.
    pub async fn load(&self) -> Result<Option<LocalData>, AppError> {
        match &self.backend {
            LocalBackend::File(path) => {
                let raw = match tokio::fs::read_to_string(path).await {
                    Ok(raw) => raw,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => {
                        return Err(AppError::LocalStorage(format!(
                            "Failed to read {}: {}",
                            path.display(),
                            e
                        )))
                    }
                };
                parse_local_data(&raw)
            }
            LocalBackend::Memory(slot) => Ok(lock(slot).clone()),
        }
    }

    /// Replace local data.
    pub async fn save(&self, data: &LocalData) -> Result<(), AppError> {
        match &self.backend {
            LocalBackend::File(path) => {
                if let Some(dir) = path.parent() {
                    tokio::fs::create_dir_all(dir).await.map_err(|e| {
                        AppError::LocalStorage(format!(
                            "Failed to create {}: {}",
                            dir.display(),
                            e
                        ))
                    })?;
                }
                let json = serde_json::to_string_pretty(data)
                    .map_err(|e| AppError::LocalStorage(e.to_string()))?;
                tokio::fs::write(path, json).await.map_err(|e| {
                    AppError::LocalStorage(format!("Failed to write {}: {}", path.display(), e))
                })
            }
            LocalBackend::Memory(slot) => {
                *lock(slot) = Some(data.clone());
                Ok(())
            }
        }
    }

    /// Remove both keys.
    pub async fn clear(&self) -> Result<(), AppError> {
        match &self.backend {
            LocalBackend::File(path) => match tokio::fs::remove_file(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AppError::LocalStorage(format!(
                    "Failed to remove {}: {}",
                    path.display(),
                    e
                ))),
            },
            LocalBackend::Memory(slot) => {
                *lock(slot) = None;
                Ok(())
            }
        }
    }
}

/// The habits key decides whether there is anything to migrate; a missing
/// logs key means no completions.
fn parse_local_data(raw: &str) -> Result<Option<LocalData>, AppError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| AppError::LocalStorage(format!("Corrupt local storage: {}", e)))?;

    if value.get("t2sar_habits").is_none() {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| AppError::LocalStorage(format!("Corrupt local storage: {}", e)))
}

fn lock(slot: &Mutex<Option<LocalData>>) -> std::sync::MutexGuard<'_, Option<LocalData>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, HabitLog, Icon, NewHabit};

    fn sample() -> LocalData {
        let habit = NewHabit::new("Stretch", Category::Health, Icon::Heart)
            .into_habit("2026-01-01T00:00:00.000Z".to_string());
        let mut logs = HabitLog::new();
        logs.push(&habit.id, chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        LocalData {
            habits: vec![habit],
            logs,
        }
    }

    #[tokio::test]
    async fn file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::in_dir(dir.path().join("nested"));

        assert_eq!(store.load().await.unwrap(), None);

        let data = sample();
        store.save(&data).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(data));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // Clearing twice is fine
        store.clear().await.unwrap();
    }

    #[test]
    fn habits_key_gates_migration() {
        assert_eq!(parse_local_data(r#"{"t2sar_logs":{}}"#).unwrap(), None);

        let data = parse_local_data(r#"{"t2sar_habits":[]}"#).unwrap().unwrap();
        assert!(data.habits.is_empty());
        assert!(data.logs.is_empty());

        assert!(parse_local_data("not json").is_err());
    }
}
