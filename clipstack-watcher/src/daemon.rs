//! Top-level run loop of the `clipstack` daemon.

use crate::capture::{CaptureOrchestrator, ClipboardChange};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Why the daemon stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The change feed closed and nothing else was being served
    FeedClosed,
    /// The socket server task ended
    ServerStopped,
    /// Ctrl+C or another external shutdown signal
    Shutdown,
}

/// Capture changes until shutdown.
///
/// With a socket server running, the end of the change feed does not stop the
/// daemon: it keeps answering socket requests until `shutdown` resolves or the
/// server task ends.
pub async fn run_until_stopped<F>(
    orchestrator: &CaptureOrchestrator,
    changes: mpsc::Receiver<ClipboardChange>,
    server: Option<JoinHandle<()>>,
    shutdown: F,
) -> StopReason
where
    F: Future<Output = ()>,
{
    let work = async move {
        orchestrator.run(changes).await;
        match server {
            Some(server) => {
                info!("Change feed closed, still serving history over the socket");
                if let Err(e) = server.await {
                    warn!("History server task failed: {}", e);
                }
                StopReason::ServerStopped
            }
            None => StopReason::FeedClosed,
        }
    };

    tokio::select! {
        reason = work => reason,
        _ = shutdown => {
            info!("Received shutdown signal");
            StopReason::Shutdown
        }
    }
}

/// Log level for the subscriber once the config is known.
///
/// Unknown level names fall back to `info`.
pub fn log_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        "off" => "off",
        other => {
            warn!("Unknown log level {:?}, using info", other);
            "info"
        }
    }
}
