//! External audio player fed through stdin.
//!
//! One player process is spawned per utterance (default `ffplay -i - -nodisp
//! -autoexit -loglevel error`). The synthesized payload is copied into its
//! stdin as it streams in, and the process exit status decides the outcome.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parley_core::PlayerSettings;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AudioPayload, AudioRenderer, RenderOutcome};
use crate::error::RenderError;

/// Longest stderr excerpt kept in [`RenderError::Exit`].
const MAX_STDERR_BYTES: usize = 2048;

/// How long the stdin feeder may outlive the player.
const FEEDER_GRACE: Duration = Duration::from_secs(1);

/// [`AudioRenderer`] that pipes audio into an external player.
#[derive(Debug, Clone)]
pub struct ProcessAudioRenderer {
    program: String,
    args: Vec<String>,
}

impl ProcessAudioRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_settings(player: &PlayerSettings) -> Self {
        Self::new(player.program.clone(), player.args.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn(&self) -> Result<Child, RenderError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

impl Default for ProcessAudioRenderer {
    fn default() -> Self {
        Self::from_settings(&PlayerSettings::default())
    }
}

#[async_trait]
impl AudioRenderer for ProcessAudioRenderer {
    async fn render(
        &self,
        payload: AudioPayload,
        cancel: CancellationToken,
    ) -> Result<RenderOutcome, RenderError> {
        if cancel.is_cancelled() {
            return Ok(RenderOutcome::Cancelled);
        }

        let mut child = self.spawn()?;
        debug!(program = %self.program, pid = child.id(), "Audio player started");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Io(std::io::Error::other("player stdin not piped")))?;
        let stderr = child.stderr.take();

        let mut feeder = tokio::spawn(feed_stdin(payload, stdin));
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                // Drain fully so a chatty player never blocks on a full pipe.
                let _ = stderr.read_to_end(&mut buf).await;
            }
            buf.truncate(MAX_STDERR_BYTES);
            buf
        });

        let exited = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };

        let Some(status) = exited else {
            feeder.abort();
            stderr_task.abort();
            // SIGKILL on Unix; `kill` also reaps the process.
            if let Err(e) = child.kill().await {
                warn!(program = %self.program, error = %e, "Failed to kill audio player");
            }
            debug!(program = %self.program, "Audio player killed");
            return Ok(RenderOutcome::Cancelled);
        };
        let status = status?;

        // The feeder may still be waiting on a slow payload the player no
        // longer wants.
        let fed = match tokio::time::timeout(FEEDER_GRACE, &mut feeder).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(RenderError::Io(std::io::Error::other(e))),
            Err(_) => {
                feeder.abort();
                debug!(program = %self.program, "Player exited before payload ended");
                Ok(0)
            }
        };
        let stderr_buf = stderr_task.await.unwrap_or_default();

        let bytes = fed?;
        if !status.success() {
            return Err(RenderError::Exit {
                status,
                stderr: String::from_utf8_lossy(&stderr_buf).trim().to_string(),
            });
        }

        debug!(program = %self.program, bytes, "Audio player finished");
        Ok(RenderOutcome::Completed)
    }
}

/// Copy the payload into the player's stdin, then close it.
///
/// A player that exits before reading everything shows up as a broken pipe;
/// that is not an error here, the exit status decides.
async fn feed_stdin(mut payload: AudioPayload, mut stdin: ChildStdin) -> Result<u64, RenderError> {
    let mut written: u64 = 0;

    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(RenderError::Payload)?;
        match stdin.write_all(&chunk).await {
            Ok(()) => written += chunk.len() as u64,
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!(written, "Audio player closed stdin early");
                return Ok(written);
            }
            Err(e) => return Err(RenderError::Io(e)),
        }
    }

    match stdin.shutdown().await {
        Ok(()) => Ok(written),
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(written),
        Err(e) => Err(RenderError::Io(e)),
    }
}
