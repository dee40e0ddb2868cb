// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod chat;
pub mod habit;
pub mod icon;
pub mod log;
pub mod stats;
pub mod user;

pub use chat::{ChatMessage, ChatRole, HabitSuggestion};
pub use habit::{Category, Habit, NewHabit};
pub use icon::Icon;
pub use log::HabitLog;
pub use stats::{GrowthStage, HeatmapLevel, UserStats};
pub use user::{Identity, LocalData, UserDocument};
