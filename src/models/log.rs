// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Date-indexed completion log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::date_key;

/// Completed habit ids per calendar day (`YYYY-MM-DD` -> ids).
///
/// Each day's list keeps insertion order and does not prevent duplicates.
/// Deleting a habit does not touch the log, so ids of deleted habits may
/// remain here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HabitLog(BTreeMap<String, Vec<String>>);

impl HabitLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids completed on `date` (empty if the day has no entry).
    pub fn completed_on(&self, date: NaiveDate) -> &[String] {
        self.completed_on_key(&date_key(date))
    }

    pub fn completed_on_key(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_completed(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.completed_on(date).iter().any(|id| id == habit_id)
    }

    /// Append `habit_id` to the day's list, creating the day if needed.
    pub fn push(&mut self, habit_id: &str, date: NaiveDate) {
        self.0
            .entry(date_key(date))
            .or_default()
            .push(habit_id.to_string());
    }

    /// Remove every occurrence of `habit_id` from the day's list.
    ///
    /// The day key stays present (possibly empty), matching what other
    /// clients write for an un-completed day.
    pub fn remove(&mut self, habit_id: &str, date: NaiveDate) {
        if let Some(ids) = self.0.get_mut(&date_key(date)) {
            ids.retain(|id| id != habit_id);
        }
    }

    /// Total completions across all days.
    pub fn total_completions(&self) -> u64 {
        self.0.values().map(|ids| ids.len() as u64).sum()
    }

    /// Completion count for one day.
    pub fn count_on(&self, date: NaiveDate) -> usize {
        self.completed_on(date).len()
    }

    /// The `n` most recent days, newest first.
    pub fn recent(&self, n: usize) -> Vec<(&str, &[String])> {
        self.0
            .iter()
            .rev()
            .take(n)
            .map(|(day, ids)| (day.as_str(), ids.as_slice()))
            .collect()
    }

    pub fn days(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(day, ids)| (day.as_str(), ids.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite each day present in `other`; days only in `self` are kept.
    pub fn merge_days(&mut self, other: &HabitLog) {
        for (day, ids) in &other.0 {
            self.0.insert(day.clone(), ids.clone());
        }
    }
}

impl FromIterator<(String, Vec<String>)> for HabitLog {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
