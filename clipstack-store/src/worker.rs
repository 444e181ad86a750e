//! Store worker: an isolated execution context that owns the database.
//!
//! A worker is reached only through a pair of channels. Requests go in on one,
//! responses come back on the other. When the worker dies its response sender
//! is dropped, which is how the client notices.

use crate::dedup::{Clock, DuplicatePolicy, SystemClock};
use crate::processor::CommandProcessor;
use crate::protocol::{Request, Response};
use crate::storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Client-side ends of a running worker
pub struct WorkerChannels {
    pub requests: mpsc::UnboundedSender<Request>,
    pub responses: mpsc::UnboundedReceiver<Response>,
}

/// Starts a fresh worker. Called lazily, and again after a worker dies.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self) -> std::io::Result<WorkerChannels>;
}

/// Where the worker's database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

impl StoreLocation {
    fn open(&self) -> Result<Storage, crate::storage::StorageError> {
        match self {
            StoreLocation::File(path) => Storage::open(path),
            StoreLocation::InMemory => Storage::open_in_memory(),
        }
    }
}

/// Runs the command processor on a dedicated OS thread
pub struct ThreadWorker {
    location: StoreLocation,
    policy: DuplicatePolicy,
    clock: Arc<dyn Clock>,
}

impl ThreadWorker {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location,
            policy: DuplicatePolicy::with_defaults(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl WorkerLauncher for ThreadWorker {
    fn launch(&self) -> std::io::Result<WorkerChannels> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let location = self.location.clone();
        let policy = self.policy;
        let clock = Arc::clone(&self.clock);

        std::thread::Builder::new()
            .name("clipstack-store".to_string())
            .spawn(move || {
                // The store is opened on the worker thread so the connection never leaves it
                let storage = match location.open() {
                    Ok(storage) => storage,
                    Err(e) => {
                        error!("Store worker failed to open {:?}: {}", location, e);
                        return;
                    }
                };
                match storage.stats() {
                    Ok(stats) => info!(
                        "Store worker started on {:?} ({} items, {} code, newest at {:?}, duplicate window {} ms)",
                        location,
                        stats.item_count,
                        stats.code_count,
                        stats.newest_timestamp,
                        policy.window_ms()
                    ),
                    Err(e) => warn!("Store worker started on {:?}, stats unavailable: {}", location, e),
                }

                let processor = CommandProcessor::new(storage)
                    .with_policy(policy)
                    .with_clock(clock);
                run_worker(processor, request_rx, response_tx);

                info!("Store worker stopped");
            })?;

        Ok(WorkerChannels {
            requests: request_tx,
            responses: response_rx,
        })
    }
}

/// Command loop: one request at a time, in arrival order, until either side hangs up
pub fn run_worker(
    mut processor: CommandProcessor,
    mut requests: mpsc::UnboundedReceiver<Request>,
    responses: mpsc::UnboundedSender<Response>,
) {
    while let Some(request) = requests.blocking_recv() {
        let response = processor.handle(request);
        if responses.send(response).is_err() {
            break;
        }
    }
}
