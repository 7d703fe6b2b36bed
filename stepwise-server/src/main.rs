//! Stepwise Server
//!
//! JSON-RPC server that lets a debugger host delegate stepping decisions.
//! Communicates via stdin/stdout for easy subprocess management.

use anyhow::{Context, Result};
use std::io;
use stepwise_core::protocol::RpcMessage;
use stepwise_core::{Request, Response, StepSettings};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod handler;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging goes to stderr; stdout is for JSON-RPC
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => StepSettings::load(&path).with_context(|| format!("loading settings from {}", path))?,
        None => StepSettings::default(),
    };
    info!(?settings, "stepwise-server starting...");

    let mut handler = handler::Handler::new(settings);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        let (response, shutdown) = match serde_json::from_str::<RpcMessage<Request>>(&line) {
            Ok(msg) => {
                let shutdown = matches!(msg.content, Request::Shutdown);
                let result = handler.handle(&msg.content);
                (RpcMessage::new(msg.id.unwrap_or(0), result), shutdown)
            }
            Err(e) => (
                RpcMessage::new(0, Response::error(format!("Parse error: {}", e))),
                false,
            ),
        };

        let mut response_json = serde_json::to_string(&response)?;
        debug!("Sending: {}", response_json);
        response_json.push('\n');
        stdout.write_all(response_json.as_bytes()).await?;
        stdout.flush().await?;

        if shutdown {
            break;
        }
    }

    info!("stepwise-server shutting down");
    Ok(())
}
