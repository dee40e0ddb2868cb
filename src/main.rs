// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Habit Tracker sync agent
//!
//! Signs in with a Firebase ID token, keeps the user's habits in sync, and
//! logs every change with the derived stats until Ctrl-C.

use anyhow::Context;
use habit_tracker::{config::Config, services::IdTokenVerifier, time_utils::today, AppContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(project = %config.firebase_project_id, "Starting habit tracker sync agent");

    let id_token = std::env::var("HABIT_ID_TOKEN").context("HABIT_ID_TOKEN is not set")?;
    let verifier = IdTokenVerifier::new(&config)?;
    let identity = match verifier.verify(&id_token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!(error = %e, "Sign-in failed");
            anyhow::bail!(e.user_message());
        }
    };

    let mut ctx = AppContext::from_config(config)
        .await
        .context("Failed to connect to Firestore")?;

    let session = ctx.sign_in(identity).await;
    tracing::info!(
        uid = %session.identity.uid,
        name = session.identity.first_name().unwrap_or("friend"),
        migration = ?session.migration,
        "Signed in"
    );

    let controller = &session.controller;
    let mut changes = controller.watch_changes();
    let mut status = controller.watch_status();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = changes.changed() => {
                let stats = controller.stats();
                tracing::info!(
                    habits = controller.habits().len(),
                    xp = stats.xp,
                    level = stats.level,
                    total_completed = stats.total_habits_completed,
                    completed_today = controller.logs().count_on(today()),
                    "State changed"
                );
            }
            Ok(()) = status.changed() => {
                let current = *status.borrow_and_update();
                tracing::info!(status = ?current, "Sync status changed");
            }
        }
    }

    ctx.sign_out().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("habit_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
