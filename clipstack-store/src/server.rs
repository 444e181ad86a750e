//! Unix socket server exposing the action protocol to out-of-process callers.
//!
//! Each line received is one JSON request (`{id, action, payload}`) and gets
//! exactly one JSON response line back. Requests are forwarded through the
//! shared [`PersistenceClient`], so the process still runs a single worker.

use crate::client::{PersistenceClient, PersistenceError};
use crate::protocol::{Command, RawRequest, Response};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

/// History server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the Unix socket
    pub socket_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let runtime_dir = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            socket_path: runtime_dir.join("clipstack.sock"),
        }
    }
}

pub struct HistoryServer {
    config: ServerConfig,
    client: PersistenceClient,
}

impl HistoryServer {
    pub fn new(config: ServerConfig, client: PersistenceClient) -> Self {
        Self { config, client }
    }

    /// Get the socket path
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Bind the socket and serve connections until the task is dropped
    pub async fn run(&self) -> std::io::Result<()> {
        // Remove a stale socket left by a previous run
        if self.config.socket_path.exists() {
            std::fs::remove_file(&self.config.socket_path)?;
        }

        let listener = UnixListener::bind(&self.config.socket_path)?;
        info!("History server listening on {:?}", self.config.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let client = self.client.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, client).await {
                            error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(stream: UnixStream, client: PersistenceClient) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    // One JSON request per line
    while reader.read_line(&mut line).await? > 0 {
        if line.trim().is_empty() {
            line.clear();
            continue;
        }

        let reply = match serde_json::from_str::<RawRequest>(&line) {
            Ok(raw) => {
                debug!("Received request {} ({})", raw.id, raw.action);
                let response = dispatch(&client, raw).await;
                serde_json::to_string(&response)
            }
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                serde_json::to_string(&serde_json::json!({ "error": format!("parse error: {}", e) }))
            }
        }
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        line.clear();
    }

    Ok(())
}

/// Run one raw request through the client, answering with the caller's own id
async fn dispatch(client: &PersistenceClient, raw: RawRequest) -> Response {
    let id = raw.id;
    let command = match Command::decode(&raw.action, raw.payload) {
        Ok(command) => command,
        Err(e) => return Response::error(id, e.to_string()),
    };

    match client.call(command).await {
        Ok(reply) => Response::ok(id, reply),
        Err(PersistenceError::Remote(message)) => Response::error(id, message),
        Err(e) => Response::error(id, e.to_string()),
    }
}
