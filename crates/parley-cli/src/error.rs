//! CLI-specific error types and exit codes.
//!
//! Only startup can fail the process. Errors during a turn are printed and
//! the session keeps going.

use parley_core::{SettingsError, TransportError};
use parley_voice::SynthesisError;
use thiserror::Error;

/// Errors that abort the CLI before the first prompt.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid flags or environment.
    #[error("Configuration error: {0}")]
    Config(#[from] SettingsError),

    /// The model client could not be created.
    #[error("Model transport error: {0}")]
    Transport(#[from] TransportError),

    /// The synthesis client could not be created.
    #[error("Speech synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl CliError {
    /// Map error to appropriate exit code (see sysexits.h).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78, // EX_CONFIG
            Self::Transport(_) | Self::Synthesis(_) => 69, // EX_UNAVAILABLE
        }
    }
}
