//! Stdio transport: newline-delimited JSON-RPC on stdin/stdout.
//!
//! One JSON object per `\n`-terminated line in, one per line out.
//! Notifications produce no output line. The loop is single-threaded and
//! ends at EOF.

use crate::error::INTERNAL_ERROR;
use crate::protocol::{rpc, McpRouter};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Serve the router over stdin/stdout until EOF.
pub async fn serve(router: McpRouter) -> std::io::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(message) => router.handle(message).await,
            Err(parse_err) => {
                // Echo an internal_error when the frame still yields an id;
                // otherwise skip the line.
                match rpc::recover_id(trimmed) {
                    Some(id) => {
                        warn!(error = %parse_err, "unparseable frame with recoverable id");
                        Some(rpc::error_response(
                            Some(&id),
                            INTERNAL_ERROR,
                            &format!("Parse error: {parse_err}"),
                        ))
                    }
                    None => {
                        warn!(error = %parse_err, "unparseable frame discarded");
                        None
                    }
                }
            }
        };

        if let Some(response) = response {
            let mut encoded = serde_json::to_string(&response)
                .unwrap_or_else(|_| rpc::error_response(None, INTERNAL_ERROR, "Encoding failure").to_string());
            encoded.push('\n');
            stdout.write_all(encoded.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    debug!("stdin reached EOF; stdio transport stopping");
    Ok(())
}
