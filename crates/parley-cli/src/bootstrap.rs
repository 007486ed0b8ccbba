//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter. All concrete implementations are instantiated here:
//! - Chat transport (via parley-runtime)
//! - Speech synthesis, audio rendering and the playback session (via parley-voice)
//! - The conversation loop (via parley-core)
//!
//! The chat handler receives the fully-composed context and delegates to it.

use std::sync::Arc;

use parley_core::{ConversationLoop, NoopSpeechSink, Settings, SpeechSink, validate_settings};
use parley_runtime::OllamaChatClient;
use parley_voice::{
    HttpSpeechSynthesizer, PlaybackConfig, PlaybackEvent, PlaybackSession, ProcessAudioRenderer,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Fully composed session context for the chat handler.
pub struct CliContext {
    settings: Settings,
    conversation: ConversationLoop,
    playback: Option<Arc<PlaybackSession>>,
}

impl CliContext {
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn conversation(&self) -> &ConversationLoop {
        &self.conversation
    }

    pub const fn conversation_mut(&mut self) -> &mut ConversationLoop {
        &mut self.conversation
    }

    /// The playback session, absent for text-only sessions.
    pub const fn playback(&self) -> Option<&Arc<PlaybackSession>> {
        self.playback.as_ref()
    }

    /// Stop speech and wait for the playback worker to exit.
    pub async fn shutdown(&self) {
        self.conversation.interrupt();
        if let Some(playback) = &self.playback {
            playback.shutdown().await;
        }
    }
}

/// Build the CLI context from validated settings.
///
/// With `speech_enabled` false, replies are only printed.
///
/// # Errors
///
/// Returns an error when the settings are invalid or an HTTP client cannot
/// be created.
pub fn bootstrap(settings: Settings, speech_enabled: bool) -> Result<CliContext, CliError> {
    validate_settings(&settings)?;

    let transport = Arc::new(OllamaChatClient::new(&settings.server_url)?);

    let (speech, playback) = if speech_enabled {
        let synthesizer = Arc::new(HttpSpeechSynthesizer::new(
            settings.synthesis_url.clone(),
            settings.voice.clone(),
        )?);
        let renderer = Arc::new(ProcessAudioRenderer::from_settings(&settings.player));

        let session = Arc::new(PlaybackSession::start(
            PlaybackConfig::from(&settings),
            synthesizer,
            renderer,
        ));
        if let Some(events) = session.take_events() {
            tokio::spawn(log_playback_events(events));
        }

        let sink: Arc<dyn SpeechSink> = session.clone();
        (sink, Some(session))
    } else {
        info!("Speech disabled, replies are printed only");
        let sink: Arc<dyn SpeechSink> = Arc::new(NoopSpeechSink);
        (sink, None)
    };

    info!(
        server = %settings.server_url,
        model = %settings.model,
        speech = speech_enabled,
        "CLI context ready"
    );

    let conversation = ConversationLoop::new(transport, speech, settings.model.clone());

    Ok(CliContext {
        settings,
        conversation,
        playback,
    })
}

async fn log_playback_events(mut events: UnboundedReceiver<PlaybackEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PlaybackEvent::Started { text } => debug!(%text, "Speaking"),
            PlaybackEvent::Finished { text } => debug!(%text, "Finished speaking"),
            PlaybackEvent::Interrupted { text } => debug!(%text, "Speech interrupted"),
            PlaybackEvent::Skipped { text, reason } => debug!(%text, reason, "Speech skipped"),
            PlaybackEvent::Failed { text, error } => {
                warn!(%text, %error, "Could not speak sentence");
            }
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over `warn`.
/// Logs go to stderr so they never interleave with the streamed reply.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
