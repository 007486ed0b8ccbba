//! HTTP speech synthesis client.
//!
//! Posts `{"text", "language", "speed", "speaker"}` to the synthesis endpoint
//! and streams the audio body back without buffering it.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parley_core::VoiceSettings;
use serde::Serialize;
use tracing::{debug, warn};

use super::{AudioPayload, SpeechSynthesizer};
use crate::error::SynthesisError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in [`SynthesisError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    language: &'a str,
    speed: f32,
    speaker: &'a str,
}

/// [`SpeechSynthesizer`] backed by an HTTP streaming TTS service.
#[derive(Debug, Clone)]
pub struct HttpSpeechSynthesizer {
    http: reqwest::Client,
    url: String,
    voice: VoiceSettings,
}

impl HttpSpeechSynthesizer {
    pub fn new(url: impl Into<String>, voice: VoiceSettings) -> Result<Self, SynthesisError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| SynthesisError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, url, voice))
    }

    /// Create a synthesizer that shares an existing connection pool.
    pub fn with_client(http: reqwest::Client, url: impl Into<String>, voice: VoiceSettings) -> Self {
        Self {
            http,
            url: url.into(),
            voice,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub const fn voice(&self) -> &VoiceSettings {
        &self.voice
    }

    fn request_body<'a>(&'a self, text: &'a str) -> SynthesisRequest<'a> {
        SynthesisRequest {
            text,
            language: &self.voice.language,
            speed: self.voice.speed,
            speaker: &self.voice.speaker,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<AudioPayload, SynthesisError> {
        debug!(url = %self.url, chars = text.len(), "Requesting speech synthesis");

        let response = self
            .http
            .post(&self.url)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Synthesis service returned error status");
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let audio = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| SynthesisError::Stream(e.to_string())));
        Ok(Box::pin(audio))
    }
}
