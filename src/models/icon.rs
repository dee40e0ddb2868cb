// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Habit icons.
//!
//! Icons are stored as their Lucide token name (e.g. `"Dumbbell"`). Tokens
//! outside the supported set are kept verbatim in [`Icon::Other`] so they are
//! written back unchanged; they render as [`Icon::FALLBACK`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// An icon identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Icon {
    Activity,
    Zap,
    Book,
    Dumbbell,
    Heart,
    Brain,
    Moon,
    Sun,
    Coffee,
    Droplet,
    Music,
    Pen,
    Code,
    Leaf,
    Bike,
    Footprints,
    Smile,
    Target,
    /// A token with no supported glyph, stored as written.
    Other(String),
}

impl Icon {
    /// Icon rendered for unsupported tokens.
    pub const FALLBACK: Icon = Icon::Activity;

    pub const SUPPORTED: [Icon; 18] = [
        Icon::Activity,
        Icon::Zap,
        Icon::Book,
        Icon::Dumbbell,
        Icon::Heart,
        Icon::Brain,
        Icon::Moon,
        Icon::Sun,
        Icon::Coffee,
        Icon::Droplet,
        Icon::Music,
        Icon::Pen,
        Icon::Code,
        Icon::Leaf,
        Icon::Bike,
        Icon::Footprints,
        Icon::Smile,
        Icon::Target,
    ];

    /// The token name as stored in documents.
    pub fn as_str(&self) -> &str {
        match self {
            Icon::Activity => "Activity",
            Icon::Zap => "Zap",
            Icon::Book => "Book",
            Icon::Dumbbell => "Dumbbell",
            Icon::Heart => "Heart",
            Icon::Brain => "Brain",
            Icon::Moon => "Moon",
            Icon::Sun => "Sun",
            Icon::Coffee => "Coffee",
            Icon::Droplet => "Droplet",
            Icon::Music => "Music",
            Icon::Pen => "Pen",
            Icon::Code => "Code",
            Icon::Leaf => "Leaf",
            Icon::Bike => "Bike",
            Icon::Footprints => "Footprints",
            Icon::Smile => "Smile",
            Icon::Target => "Target",
            Icon::Other(token) => token,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Icon::Other(_))
    }

    /// The icon to draw: itself when supported, otherwise [`Icon::FALLBACK`].
    pub fn rendered(&self) -> Icon {
        if self.is_supported() {
            self.clone()
        } else {
            Icon::FALLBACK
        }
    }

    /// Resolve free-form input such as advisor suggestions.
    ///
    /// Matching ignores ASCII case since suggestions are not consistently
    /// capitalised. Unmatched tokens are kept, trimmed.
    pub fn from_token(token: &str) -> Icon {
        let token = token.trim();
        Icon::SUPPORTED
            .into_iter()
            .find(|icon| icon.as_str().eq_ignore_ascii_case(token))
            .unwrap_or_else(|| Icon::Other(token.to_string()))
    }
}

impl Default for Icon {
    fn default() -> Self {
        Icon::FALLBACK
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact match only, so stored tokens survive a read and write back.
impl From<String> for Icon {
    fn from(token: String) -> Self {
        Icon::SUPPORTED
            .into_iter()
            .find(|icon| icon.as_str() == token)
            .unwrap_or(Icon::Other(token))
    }
}

impl From<Icon> for String {
    fn from(icon: Icon) -> Self {
        match icon {
            Icon::Other(token) => token,
            known => known.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tokens_resolve() {
        assert_eq!(Icon::from_token("Dumbbell"), Icon::Dumbbell);
        assert_eq!(Icon::from_token("book"), Icon::Book);
        for icon in Icon::SUPPORTED {
            assert_eq!(Icon::from_token(icon.as_str()), icon);
        }
    }

    #[test]
    fn unknown_token_kept_but_rendered_as_fallback() {
        let icon = Icon::from_token(" Spaceship ");
        assert_eq!(icon, Icon::Other("Spaceship".to_string()));
        assert!(!icon.is_supported());
        assert_eq!(icon.rendered(), Icon::Activity);
        assert_eq!(Icon::Zap.rendered(), Icon::Zap);
    }

    #[test]
    fn stored_tokens_round_trip_verbatim() {
        assert_eq!(serde_json::to_string(&Icon::Zap).unwrap(), "\"Zap\"");

        for token in ["\"Flame\"", "\"book\"", "\"Heart\""] {
            let parsed: Icon = serde_json::from_str(token).unwrap();
            assert_eq!(serde_json::to_string(&parsed).unwrap(), token);
        }
        let parsed: Icon = serde_json::from_str("\"book\"").unwrap();
        assert_eq!(parsed, Icon::Other("book".to_string()));
    }
}
