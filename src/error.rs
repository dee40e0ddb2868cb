// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Nothing in this crate is fatal to the process: remote failures are
//! caught at the call site, logged, and degrade to a no-op or fallback text.

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Advisor API error: {0}")]
    Advisor(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Local storage error: {0}")]
    LocalStorage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the failure is worth another attempt (network or store hiccup).
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Advisor(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
