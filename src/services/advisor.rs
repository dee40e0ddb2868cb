// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gemini-backed habit coach.
//!
//! Stateless: each call sends one `generateContent` request. No call ever
//! fails the caller; a missing key, an empty reply, or a transport error
//! each turn into fixed fallback text (or an empty suggestion list).

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ChatMessage, ChatRole, Habit, HabitLog, HabitSuggestion};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Only the tail of the conversation is sent as context.
const CHAT_CONTEXT_MESSAGES: usize = 5;
/// Days of activity included in a progress analysis.
const ANALYSIS_DAYS: usize = 7;

const PERSONA: &str = "You are t2sar AI, an ethereal and focused habit coaching AI developed \
                       for the t2sar dream app. You are concise, philosophical, and helpful.";

/// Fixed replies used when the model cannot be asked or says nothing.
pub mod fallback {
    pub const CHAT_NO_KEY: &str = "API Key missing.";
    pub const CHAT_EMPTY: &str = "I'm listening.";
    pub const CHAT_ERROR: &str = "I'm having trouble connecting to the coaching server.";

    pub const ANALYSIS_NO_KEY: &str = "Please configure your API Key to get AI insights.";
    pub const ANALYSIS_EMPTY: &str = "Keep going! Consistency is key.";
    pub const ANALYSIS_ERROR: &str = "Unable to analyze progress at the moment.";

    pub const EXCUSE_NO_KEY: &str = "Just do 2 minutes of it. Something is better than nothing.";
    pub const EXCUSE_DEFAULT: &str = "Do it for 2 minutes. Start now.";
}

/// Gemini API client.
#[derive(Clone)]
pub struct Advisor {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl Advisor {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build advisor HTTP client, using defaults");
                reqwest::Client::new()
            });

        if config.gemini_api_key.is_none() {
            tracing::warn!("No Gemini API key configured; advisor will use fallback replies");
        }

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        }
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// One coaching chat turn.
    pub async fn chat(&self, history: &[ChatMessage], message: &str) -> String {
        if !self.has_api_key() {
            return fallback::CHAT_NO_KEY.to_string();
        }

        match self.generate(&chat_prompt(history, message), None).await {
            Ok(Some(reply)) => reply,
            Ok(None) => fallback::CHAT_EMPTY.to_string(),
            Err(e) => {
                tracing::error!(error = %e, "Advisor chat failed");
                fallback::CHAT_ERROR.to_string()
            }
        }
    }

    /// Short motivational read of the last week.
    pub async fn analyze_progress(&self, habits: &[Habit], logs: &HabitLog) -> String {
        if !self.has_api_key() {
            return fallback::ANALYSIS_NO_KEY.to_string();
        }

        match self.generate(&analysis_prompt(habits, logs), None).await {
            Ok(Some(reply)) => reply,
            Ok(None) => fallback::ANALYSIS_EMPTY.to_string(),
            Err(e) => {
                tracing::error!(error = %e, "Advisor analysis failed");
                fallback::ANALYSIS_ERROR.to_string()
            }
        }
    }

    /// Two-sentence nudge with a two-minute version of the habit.
    pub async fn excuse_buster(&self, habit_name: &str) -> String {
        if !self.has_api_key() {
            return fallback::EXCUSE_NO_KEY.to_string();
        }

        match self.generate(&excuse_prompt(habit_name), None).await {
            Ok(Some(reply)) => reply,
            Ok(None) => fallback::EXCUSE_DEFAULT.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Advisor excuse buster failed");
                fallback::EXCUSE_DEFAULT.to_string()
            }
        }
    }

    /// Habits proposed for a goal; empty on any failure.
    pub async fn suggest_habits(&self, goal: &str) -> Vec<HabitSuggestion> {
        if !self.has_api_key() {
            tracing::warn!("API Key missing");
            return Vec::new();
        }

        let text = match self
            .generate(&suggestion_prompt(goal), Some(suggestion_config()))
            .await
        {
            Ok(Some(text)) => text,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::error!(error = %e, "Advisor suggestion failed");
                return Vec::new();
            }
        };

        parse_suggestions(&text).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Advisor returned unparseable suggestions");
            Vec::new()
        })
    }

    /// Send one prompt; `Ok(None)` when the model returned no text.
    async fn generate(
        &self,
        prompt: &str,
        generation_config: Option<serde_json::Value>,
    ) -> Result<Option<String>, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Advisor("API key not configured".to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let mut body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });
        if let Some(config) = generation_config {
            body["generationConfig"] = config;
        }

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Advisor(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Gemini rate limit hit (429)");
            }
            return Err(AppError::Advisor(format!("HTTP {}: {}", status, body)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Advisor(format!("JSON parse error: {}", e)))?;

        Ok(parsed.text())
    }
}

// ─── Prompts ─────────────────────────────────────────────────

fn chat_prompt(history: &[ChatMessage], message: &str) -> String {
    let start = history.len().saturating_sub(CHAT_CONTEXT_MESSAGES);
    let context = history[start..]
        .iter()
        .map(|m| {
            let speaker = match m.role {
                ChatRole::User => "User",
                ChatRole::Model => "Coach",
            };
            format!("{}: {}", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("System: {PERSONA}\nContext:\n{context}\n\nUser: {message}\nCoach:")
}

fn analysis_prompt(habits: &[Habit], logs: &HabitLog) -> String {
    let habit_names = habits
        .iter()
        .map(|h| h.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let recent = serde_json::to_string(&logs.recent(ANALYSIS_DAYS)).unwrap_or_default();

    format!(
        "You are a motivational habit coach.\n\
         The user is tracking these habits: {habit_names}.\n\
         Here is their recent activity (Date: Completed IDs): {recent}.\n\
         Provide a short, punchy, 2-sentence motivational analysis of their week.\n\
         Be encouraging but honest. If they are doing well, celebrate it. If not, gentle nudge."
    )
}

fn excuse_prompt(habit_name: &str) -> String {
    format!(
        "The user is about to skip their habit: \"{habit_name}\".\n\
         They are feeling lazy or unmotivated.\n\
         Give a concise, \"tough love\" but encouraging \"No Zero Days\" counter-argument.\n\
         Suggest a 2-minute micro-version of this habit they can do right now just to keep the streak alive.\n\
         Max 2 sentences."
    )
}

fn suggestion_prompt(goal: &str) -> String {
    format!(
        "Generate 3 concrete, daily habit suggestions for someone who wants to: \"{goal}\".\n\
         Return JSON only. Format: Array of objects with keys: name, description, \
         category (health|productivity|learning|mindfulness|other), \
         icon (lucide icon name e.g. 'Zap', 'Book', 'Dumbbell')."
    )
}

fn suggestion_config() -> serde_json::Value {
    serde_json::json!({
        "responseMimeType": "application/json",
        "responseSchema": {
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING" },
                    "description": { "type": "STRING" },
                    "category": { "type": "STRING" },
                    "icon": { "type": "STRING" }
                }
            }
        }
    })
}

fn parse_suggestions(text: &str) -> Result<Vec<HabitSuggestion>, serde_json::Error> {
    serde_json::from_str(text.trim())
}

// ─── Wire Types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}
