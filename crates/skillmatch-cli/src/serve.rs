//! `serve`: one JSON command per input line, one JSON response per output line.
//!
//! The engine (and its store handle) lives for the whole session. A line that
//! does not parse gets a `{success: false}` response; the loop only stops at
//! end of input.

use serde_json::json;
use skillmatch_core::app::execute;
use skillmatch_core::{Command, Engine};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub async fn run<R, W>(engine: &Engine, input: R, mut output: W) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let encoded = match serde_json::from_str::<Command>(line) {
            Ok(command) => {
                tracing::debug!(command = command.name(), "serve: request");
                serde_json::to_string(&execute(engine, &command).await)?
            }
            Err(err) => {
                tracing::warn!(error = %err, "serve: unreadable request");
                json!({ "success": false, "message": format!("invalid command: {err}") }).to_string()
            }
        };
        output.write_all(encoded.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
        handled += 1;
    }

    tracing::info!(handled, "serve: input closed");
    Ok(handled)
}
