// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};

/// Format of habit log keys.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as an ISO-8601 string, as stored in `createdAt` fields.
pub fn now_iso8601() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Log key (`YYYY-MM-DD`) for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// The user's current calendar date (local time zone).
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
