//! Command-line and environment configuration.

use clap::Parser;
use parley_core::{
    DEFAULT_MODEL, DEFAULT_QUEUE_CAPACITY, DEFAULT_SERVER_URL, DEFAULT_SYNTHESIS_URL,
    PlayerSettings, Settings, VoiceSettings,
};

/// Spoken chat with a local language model.
///
/// Every option can also be set through its `PARLEY_*` environment variable
/// or a `.env` file.
#[derive(Debug, Parser)]
#[command(name = "parley")]
#[command(about = "Chat with a local language model and hear each sentence as it streams in")]
#[command(version)]
pub struct Cli {
    /// Base URL of the Ollama server
    #[arg(long, env = "PARLEY_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Model to chat with
    #[arg(short = 'm', long, env = "PARLEY_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Speech synthesis endpoint
    #[arg(long, env = "PARLEY_SYNTHESIS_URL", default_value = DEFAULT_SYNTHESIS_URL)]
    pub synthesis_url: String,

    /// Synthesis language code
    #[arg(long, env = "PARLEY_LANGUAGE")]
    pub language: Option<String>,

    /// Synthesis speaker / voice
    #[arg(long, env = "PARLEY_SPEAKER")]
    pub speaker: Option<String>,

    /// Speech speed multiplier
    #[arg(long, env = "PARLEY_SPEED")]
    pub speed: Option<f32>,

    /// Audio player fed the synthesized audio on stdin
    #[arg(long, env = "PARLEY_PLAYER")]
    pub player: Option<String>,

    /// Player arguments, whitespace separated
    #[arg(long, env = "PARLEY_PLAYER_ARGS", allow_hyphen_values = true)]
    pub player_args: Option<String>,

    /// Maximum number of sentences waiting to be spoken
    #[arg(long, env = "PARLEY_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Speak markdown as-is instead of stripping it
    #[arg(long, env = "PARLEY_KEEP_MARKDOWN")]
    pub keep_markdown: bool,

    /// Text only, no speech playback
    #[arg(long, env = "PARLEY_NO_SPEECH")]
    pub no_speech: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Session settings described by these arguments.
    pub fn settings(&self) -> Settings {
        let voice_defaults = VoiceSettings::default();
        let player_defaults = PlayerSettings::default();

        Settings {
            server_url: self.server_url.clone(),
            model: self.model.clone(),
            synthesis_url: self.synthesis_url.clone(),
            voice: VoiceSettings {
                language: self.language.clone().unwrap_or(voice_defaults.language),
                speaker: self.speaker.clone().unwrap_or(voice_defaults.speaker),
                speed: self.speed.unwrap_or(voice_defaults.speed),
            },
            player: PlayerSettings {
                program: self.player.clone().unwrap_or(player_defaults.program),
                args: self.player_args.as_deref().map_or(player_defaults.args, |args| {
                    args.split_whitespace().map(String::from).collect()
                }),
            },
            queue_capacity: self.queue_capacity,
            strip_markdown: !self.keep_markdown,
        }
    }

    /// Whether a playback session should be started.
    pub const fn speech_enabled(&self) -> bool {
        !self.no_speech
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_map_to_default_settings() {
        let cli = Cli::try_parse_from(["parley"]).unwrap();
        // Environment may override individual values on a developer machine,
        // so only compare what the flags alone decide.
        if std::env::vars().all(|(k, _)| !k.starts_with("PARLEY_")) {
            assert_eq!(cli.settings(), Settings::default());
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "parley",
            "--server-url",
            "http://gpu-box:11434",
            "-m",
            "llama3",
            "--speaker",
            "EN-US",
            "--speed",
            "1.5",
            "--player",
            "mpv",
            "--player-args",
            "--no-video -",
            "--queue-capacity",
            "8",
            "--keep-markdown",
            "--no-speech",
            "-v",
        ])
        .unwrap();

        let settings = cli.settings();
        assert_eq!(settings.server_url, "http://gpu-box:11434");
        assert_eq!(settings.model, "llama3");
        assert_eq!(settings.voice.speaker, "EN-US");
        assert!((settings.voice.speed - 1.5).abs() < f32::EPSILON);
        assert_eq!(settings.player.program, "mpv");
        assert_eq!(settings.player.args, vec!["--no-video", "-"]);
        assert_eq!(settings.queue_capacity, 8);
        assert!(!settings.strip_markdown);
        assert!(!cli.speech_enabled());
        assert!(cli.verbose);
    }

    #[test]
    fn rejects_non_numeric_capacity() {
        assert!(Cli::try_parse_from(["parley", "--queue-capacity", "lots"]).is_err());
    }
}
