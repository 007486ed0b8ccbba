//! Settings domain types and validation.
//!
//! This module contains the runtime configuration of a chat session.
//! These are pure domain types with no infrastructure dependencies; the CLI
//! fills them from flags and environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default base URL of the model server (Ollama).
pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "openchat";

/// Default endpoint of the speech synthesis service.
pub const DEFAULT_SYNTHESIS_URL: &str = "http://localhost:8888/stream";

/// Default number of utterances that may wait for playback.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Upper bound accepted for `queue_capacity`.
pub const MAX_QUEUE_CAPACITY: usize = 10_000;

/// Accepted range for the synthesis speed multiplier.
pub const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.25..=4.0;

/// Fixed voice/style parameters sent with every synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Language code understood by the synthesis service.
    pub language: String,
    /// Speaker / voice identifier.
    pub speaker: String,
    /// Speed multiplier (1.0 = normal).
    pub speed: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            language: "EN".to_string(),
            speaker: "EN-BR".to_string(),
            speed: 1.0,
        }
    }
}

/// External audio player that renders synthesized audio from its stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Program to launch (looked up on `PATH`).
    pub program: String,
    /// Arguments; the payload is always fed on stdin.
    pub args: Vec<String>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            program: "ffplay".to_string(),
            args: ["-i", "-", "-nodisp", "-autoexit", "-loglevel", "error"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the model server.
    pub server_url: String,

    /// Model identifier sent with every chat request.
    pub model: String,

    /// Full URL of the speech synthesis endpoint.
    pub synthesis_url: String,

    /// Voice parameters for synthesis.
    pub voice: VoiceSettings,

    /// Audio player used to render synthesized speech.
    pub player: PlayerSettings,

    /// Maximum number of utterances waiting for playback.
    /// Newer utterances are dropped while the queue is full.
    pub queue_capacity: usize,

    /// Strip markdown and reasoning blocks before synthesis.
    pub strip_markdown: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            synthesis_url: DEFAULT_SYNTHESIS_URL.to_string(),
            voice: VoiceSettings::default(),
            player: PlayerSettings::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            strip_markdown: true,
        }
    }
}

impl Settings {
    /// The `/api/chat` endpoint derived from `server_url`.
    #[must_use]
    pub fn chat_endpoint(&self) -> String {
        format!("{}/api/chat", self.server_url.trim_end_matches('/'))
    }
}

/// Settings validation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be an http(s) URL, got '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("queue capacity must be between 1 and {max}, got {value}")]
    InvalidQueueCapacity { value: usize, max: usize },

    #[error("voice speed must be between {min} and {max}, got {value}")]
    InvalidSpeed { value: f32, min: f32, max: f32 },
}

/// Validate settings before a session is started.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    validate_url("server_url", &settings.server_url)?;
    validate_url("synthesis_url", &settings.synthesis_url)?;

    if settings.model.trim().is_empty() {
        return Err(SettingsError::Empty("model"));
    }
    if settings.player.program.trim().is_empty() {
        return Err(SettingsError::Empty("player program"));
    }

    if settings.queue_capacity == 0 || settings.queue_capacity > MAX_QUEUE_CAPACITY {
        return Err(SettingsError::InvalidQueueCapacity {
            value: settings.queue_capacity,
            max: MAX_QUEUE_CAPACITY,
        });
    }

    if !SPEED_RANGE.contains(&settings.voice.speed) {
        return Err(SettingsError::InvalidSpeed {
            value: settings.voice.speed,
            min: *SPEED_RANGE.start(),
            max: *SPEED_RANGE.end(),
        });
    }

    Ok(())
}

fn validate_url(field: &'static str, value: &str) -> Result<(), SettingsError> {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));

    match rest {
        Some(host) if !host.trim().is_empty() => Ok(()),
        _ => Err(SettingsError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}
