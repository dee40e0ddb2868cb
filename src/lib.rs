// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Habit Tracker: daily habits, streaks and coaching
//!
//! This crate keeps a user's habits and completion log in sync with a
//! per-user Firestore document, derives gamification stats from the log,
//! and asks Gemini for coaching text.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{DocumentStore, LocalStore};
use error::{AppError, Result};
use models::Identity;
use services::{Advisor, MigrationOutcome, PersistPolicy, SyncController};

/// A signed-in user and the controller syncing their data.
pub struct Session {
    pub identity: Identity,
    pub controller: SyncController,
    /// What happened to pre-authentication local data on sign-in
    pub migration: MigrationOutcome,
}

/// Shared application state and the current session, if any.
pub struct AppContext {
    pub config: Config,
    pub store: DocumentStore,
    pub local: LocalStore,
    pub advisor: Advisor,
    session: Option<Session>,
}

impl AppContext {
    pub fn new(config: Config, store: DocumentStore, local: LocalStore) -> Self {
        let advisor = Advisor::new(&config);
        Self {
            config,
            store,
            local,
            advisor,
            session: None,
        }
    }

    /// Connect to Firestore and use the configured local data directory.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = DocumentStore::connect(&config.firebase_project_id).await?;
        let local = LocalStore::in_dir(&config.local_data_dir);
        Ok(Self::new(config, store, local))
    }

    /// Start a session: migrate local data once, then subscribe.
    ///
    /// An existing session is ended first.
    pub async fn sign_in(&mut self, identity: Identity) -> &Session {
        self.sign_out().await;

        tracing::info!(uid = %identity.uid, "Signing in");

        let policy = PersistPolicy::from_config(&self.config);
        let mut controller = SyncController::new(identity.uid.clone(), self.store.clone(), policy);
        let migration = controller.migrate_local_data(&self.local).await;
        controller.start_subscription().await;

        self.session.insert(Session {
            identity,
            controller,
            migration,
        })
    }

    /// End the session: no further notifications reach the controller, and
    /// queued persists are drained.
    pub async fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(uid = %session.identity.uid, "Signing out");
            session.controller.shutdown().await;
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The current session, or [`AppError::Unauthorized`].
    pub fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}
