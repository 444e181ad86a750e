//! ClipStack - Main entry point
//!
//! Reads clipboard changes as JSON lines (`{"text": "..."}`) on stdin, stores
//! them, and writes history updates to stdout. Optionally serves the store's
//! action protocol on a Unix socket. With the socket enabled the daemon keeps
//! serving after stdin closes, until Ctrl+C.

use async_trait::async_trait;
use clipstack_store::{ClipboardItem, DuplicatePolicy, PersistenceClient, StoreLocation, ThreadWorker};
use clipstack_watcher::{
    log_directive, run_until_stopped, CaptureOrchestrator, ClipboardChange, Config, HistoryEvent,
    HistoryObserver, Mode,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

/// Writes each history push to stdout as one JSON line
struct StdoutObserver {
    enabled: bool,
}

#[async_trait]
impl HistoryObserver for StdoutObserver {
    async fn is_visible(&self) -> bool {
        self.enabled
    }

    async fn history_changed(&self, items: Vec<ClipboardItem>) {
        let line = match serde_json::to_string(&HistoryEvent::updated(&items)) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode history update: {}", e);
                return;
            }
        };

        let mut stdout = tokio::io::stdout();
        let written = async {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        };
        if let Err(e) = written.await {
            warn!("Failed to write history update: {}", e);
        }
    }
}

/// Forward stdin lines to the capture loop until stdin closes
async fn read_changes(tx: mpsc::Sender<ClipboardChange>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<ClipboardChange>(&line) {
                Ok(change) => {
                    if tx.send(change).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Ignoring malformed change notification: {}", e),
            },
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
    info!("Change feed closed");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging comes first so config loading can report problems.
    // RUST_LOG wins; otherwise start at info and switch to the configured level.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let mut config = Config::load();
    let dev_flag = std::env::args().any(|arg| arg == "--dev");
    config.general.mode = Mode::detect(dev_flag, config.general.mode);

    if !from_env {
        let directive = log_directive(&config.general.log_level);
        if let Err(e) = filter_handle.reload(EnvFilter::new(directive)) {
            warn!("Failed to apply log level {}: {}", directive, e);
        }
    }

    info!("Starting ClipStack ({:?} mode)", config.general.mode);

    if !config.general.enabled {
        info!("Capture is disabled in configuration, exiting");
        return Ok(());
    }

    let db_path = config.db_path();
    info!("History database: {:?}", db_path);

    let worker = ThreadWorker::new(StoreLocation::File(db_path))
        .with_policy(DuplicatePolicy::new(config.capture.duplicate_window_ms));
    let client = PersistenceClient::new(worker);

    let mut server_task: Option<tokio::task::JoinHandle<()>> = None;
    #[cfg(unix)]
    let mut socket_path = None;
    #[cfg(unix)]
    if config.server.enabled {
        let mut server_config = clipstack_store::ServerConfig::default();
        if let Some(path) = &config.server.socket_path {
            server_config.socket_path = path.clone();
        }
        socket_path = Some(server_config.socket_path.clone());

        let server = clipstack_store::HistoryServer::new(server_config, client.clone());
        server_task = Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("History server error: {}", e);
            }
        }));
    }

    let observer = Arc::new(StdoutObserver {
        enabled: config.presentation.push_updates,
    });
    let orchestrator = CaptureOrchestrator::new(client.clone(), observer);

    let (tx, rx) = mpsc::channel::<ClipboardChange>(config.capture.queue_size.max(1));
    tokio::spawn(read_changes(tx));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let reason = run_until_stopped(&orchestrator, rx, server_task, shutdown).await;
    info!("Shutting down ({:?})", reason);

    client.shutdown().await;

    #[cfg(unix)]
    if let Some(path) = socket_path {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove socket {:?}: {}", path, e);
            }
        }
    }

    info!("ClipStack stopped");
    Ok(())
}
