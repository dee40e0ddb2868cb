// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - sync, identity and coaching logic.

pub mod advisor;
pub mod identity;
pub mod outbox;
pub mod sync;

pub use advisor::Advisor;
pub use identity::{AuthError, IdTokenVerifier};
pub use outbox::{Outbox, OutboxStats, PersistPolicy};
pub use sync::{MigrationOutcome, SyncController, SyncStatus};
