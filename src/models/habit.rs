// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Habit model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::models::Icon;

/// Color token given to habits created without one.
pub const DEFAULT_COLOR: &str = "bg-sky-500";

/// Habit category.
///
/// Stored lowercase. Values outside the known set (older documents, advisor
/// output saved by other clients) are kept in [`Category::Custom`] and written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    Health,
    Productivity,
    Learning,
    Mindfulness,
    Other,
    Custom(String),
}

impl Category {
    pub const KNOWN: [Category; 5] = [
        Category::Health,
        Category::Productivity,
        Category::Learning,
        Category::Mindfulness,
        Category::Other,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Health => "health",
            Category::Productivity => "productivity",
            Category::Learning => "learning",
            Category::Mindfulness => "mindfulness",
            Category::Other => "other",
            Category::Custom(value) => value,
        }
    }

    /// Lenient parse for free-form input: case-insensitive, unknown -> `Other`.
    pub fn parse_lenient(value: &str) -> Category {
        let value = value.trim();
        Category::KNOWN
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value))
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::KNOWN
            .into_iter()
            .find(|category| category.as_str() == value)
            .unwrap_or(Category::Custom(value))
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Custom(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

/// A tracked habit, stored in the user's document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Habit {
    /// Opaque unique identifier (UUID v4 for habits created here)
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub category: Category,
    /// Color token (e.g. "bg-sky-500")
    pub color: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub icon: Icon,
    /// Completion streak; never negative
    #[serde(default)]
    pub streak: u32,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
}

/// Input for creating a habit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewHabit {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(length(max = 280))]
    pub description: Option<String>,
    pub category: Category,
    pub icon: Icon,
    #[validate(length(min = 1, max = 64))]
    pub color: String,
}

impl NewHabit {
    /// Habit input with the default color and no description.
    pub fn new(name: impl Into<String>, category: Category, icon: Icon) -> Self {
        Self {
            name: name.into(),
            description: None,
            category,
            icon,
            color: DEFAULT_COLOR.to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Trim text fields; a blank description becomes `None`.
    pub fn normalized(self) -> Self {
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Self {
            name: self.name.trim().to_string(),
            description,
            category: self.category,
            icon: self.icon,
            color: self.color.trim().to_string(),
        }
    }

    /// Build the stored habit with a fresh id, zero streak, and `created_at`.
    pub fn into_habit(self, created_at: String) -> Habit {
        Habit {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            description: self.description,
            category: self.category,
            color: self.color,
            icon: self.icon,
            streak: 0,
            created_at,
        }
    }
}
