//! Chat command handler.
//!
//! Reads user lines, streams each reply to the terminal and lets the
//! conversation loop queue sentences for speech while the reply is still
//! arriving. A failed turn is reported and the session continues.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::bootstrap::CliContext;

/// Prompt printed before every user line.
pub const PROMPT: &str = "User (type 'exit' to quit): ";

/// Input line that ends the session.
pub const EXIT_COMMAND: &str = "exit";

/// Execute the interactive chat session.
///
/// Ends on end of input or an `exit` line, then stops playback and waits
/// for the playback worker.
///
/// # Errors
///
/// Returns an error only when reading input or writing output fails.
pub async fn execute<R, W>(ctx: &mut CliContext, mut input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    let result = chat_loop(ctx, &mut input, out).await;
    ctx.shutdown().await;
    result
}

async fn chat_loop<R, W>(ctx: &mut CliContext, input: &mut R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    let mut line = String::new();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            debug!("End of input");
            writeln!(out)?;
            return Ok(());
        }

        let message = line.trim_end_matches(['\r', '\n']);
        if message == EXIT_COMMAND {
            return Ok(());
        }
        if message.trim().is_empty() {
            continue;
        }

        write!(out, "Assistant: ")?;
        out.flush()?;

        let mut echo_error = None;
        let turn = ctx
            .conversation_mut()
            .run_turn(message, |delta| {
                if echo_error.is_some() {
                    return;
                }
                if let Err(e) = out.write_all(delta.as_bytes()).and_then(|()| out.flush()) {
                    echo_error = Some(e);
                }
            })
            .await;

        if let Some(e) = echo_error {
            return Err(e.into());
        }

        match turn {
            Ok(summary) => {
                debug!(
                    queued = summary.queued,
                    dropped = summary.dropped,
                    "Reply complete"
                );
                write!(out, "\n\n")?;
            }
            Err(e) => {
                writeln!(out)?;
                writeln!(out, "Error: {e}")?;
                writeln!(out)?;
            }
        }
    }
}
