//! Command Shell
//!
//! Line-oriented front end for the `ttl_cache` binary: reads commands from
//! an async reader and writes one JSON response per line.

mod handlers;

pub use handlers::{execute, ShellCache};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::models::{Command, ErrorResponse, Response};

/// Serves commands until `QUIT` or end of input.
///
/// Blank lines are skipped. Malformed lines get an error response and the
/// session continues.
pub async fn run<R, W>(cache: &ShellCache, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, quit) = match line.parse::<Command>() {
            Ok(command) => {
                debug!(command = command.name(), "Executing shell command");
                let quit = command == Command::Quit;
                (execute(cache, command).await, quit)
            }
            Err(err) => {
                warn!(error = %err, "Rejected shell input");
                (Response::Error(ErrorResponse::new(err.to_string())), false)
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;

        if quit {
            break;
        }
    }
    Ok(())
}
