//! Request correlation layer.
//!
//! [`PersistenceClient`] is the only way the rest of the process talks to the
//! store. It numbers every request, remembers who is waiting for which id, and
//! routes each response back to its caller regardless of arrival order. It
//! also owns the worker: launched on first use, relaunched on the next call
//! after a crash.

use crate::item::{ClipboardItem, HistoryFilter};
use crate::protocol::{Command, Reply, Request, RequestId, Response, DEFAULT_RECENT_LIMIT};
use crate::worker::{WorkerChannels, WorkerLauncher};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The worker ran the action and reported a failure
    #[error("store error: {0}")]
    Remote(String),
    /// The worker died before answering
    #[error("store worker restarted before replying")]
    TransportReset,
    #[error("store worker unavailable: {0}")]
    WorkerUnavailable(String),
    #[error("unexpected {kind} reply to {action}")]
    UnexpectedReply { action: &'static str, kind: &'static str },
}

type Completion = oneshot::Sender<Result<Reply, PersistenceError>>;

/// A caller waiting on a reply from a particular worker generation
struct PendingCall {
    generation: u64,
    completion: Completion,
}

struct WorkerLink {
    generation: u64,
    requests: mpsc::UnboundedSender<Request>,
}

struct ClientState {
    next_id: RequestId,
    generation: u64,
    worker: Option<WorkerLink>,
    pending: HashMap<RequestId, PendingCall>,
}

impl ClientState {
    /// Drop the worker of `generation` and fail everything still waiting on it
    fn reset_generation(&mut self, generation: u64) -> usize {
        if self.worker.as_ref().map(|w| w.generation) == Some(generation) {
            self.worker = None;
        }

        let orphaned: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, call)| call.generation == generation)
            .map(|(id, _)| *id)
            .collect();

        for id in &orphaned {
            if let Some(call) = self.pending.remove(id) {
                let _ = call.completion.send(Err(PersistenceError::TransportReset));
            }
        }
        orphaned.len()
    }
}

/// Handle to the store worker. Clones share the same worker and correlation table.
#[derive(Clone)]
pub struct PersistenceClient {
    launcher: Arc<dyn WorkerLauncher>,
    state: Arc<Mutex<ClientState>>,
}

impl PersistenceClient {
    pub fn new(launcher: impl WorkerLauncher + 'static) -> Self {
        Self {
            launcher: Arc::new(launcher),
            state: Arc::new(Mutex::new(ClientState {
                next_id: 0,
                generation: 0,
                worker: None,
                pending: HashMap::new(),
            })),
        }
    }

    /// Persist `item` and return the id the store assigned
    pub async fn save_clipboard_item(&self, item: ClipboardItem) -> Result<i64, PersistenceError> {
        match self.call(Command::SaveClipboardItem(item)).await? {
            Reply::Saved(id) => Ok(id),
            other => Err(unexpected("saveClipboardItem", &other)),
        }
    }

    /// Up to 50 items matching `filter`, newest first
    pub async fn get_clipboard_history(
        &self,
        filter: HistoryFilter,
    ) -> Result<Vec<ClipboardItem>, PersistenceError> {
        match self.call(Command::GetClipboardHistory(filter)).await? {
            Reply::Items(items) => Ok(items),
            other => Err(unexpected("getClipboardHistory", &other)),
        }
    }

    pub async fn is_duplicate_clipboard_item(
        &self,
        content: impl Into<String>,
    ) -> Result<bool, PersistenceError> {
        let command = Command::IsDuplicateClipboardItem {
            content: content.into(),
        };
        match self.call(command).await? {
            Reply::Duplicate(duplicate) => Ok(duplicate),
            other => Err(unexpected("isDuplicateClipboardItem", &other)),
        }
    }

    pub async fn get_recent_items(&self, limit: u32) -> Result<Vec<ClipboardItem>, PersistenceError> {
        match self.call(Command::GetRecentItems { limit }).await? {
            Reply::Items(items) => Ok(items),
            other => Err(unexpected("getRecentItems", &other)),
        }
    }

    pub async fn get_recent_items_default(&self) -> Result<Vec<ClipboardItem>, PersistenceError> {
        self.get_recent_items(DEFAULT_RECENT_LIMIT).await
    }

    /// Send `command` to the worker and wait for its correlated reply.
    ///
    /// There is no timeout; wrap the future in `tokio::time::timeout` if
    /// bounded latency is needed.
    pub async fn call(&self, command: Command) -> Result<Reply, PersistenceError> {
        let (completion, reply) = oneshot::channel();

        {
            let mut state = self.state.lock().await;
            let (generation, requests) = self.ensure_worker(&mut state)?;

            let id = state.next_id;
            state.next_id += 1;
            state.pending.insert(
                id,
                PendingCall {
                    generation,
                    completion,
                },
            );

            let action = command.action();
            if requests.send(Request { id, command }).is_err() {
                warn!("Store worker gone while sending request {} ({})", id, action);
                state.reset_generation(generation);
            } else {
                debug!("Sent request {} ({})", id, action);
            }
        }

        reply.await.unwrap_or(Err(PersistenceError::TransportReset))
    }

    /// Number of requests sent but not yet answered
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// How many workers have been launched so far
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Release the current worker. It finishes queued requests, then exits.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.worker.take().is_some() {
            info!("Store worker released");
        }
    }

    fn ensure_worker(
        &self,
        state: &mut ClientState,
    ) -> Result<(u64, mpsc::UnboundedSender<Request>), PersistenceError> {
        if let Some(worker) = &state.worker {
            return Ok((worker.generation, worker.requests.clone()));
        }

        let WorkerChannels {
            requests,
            responses,
        } = self
            .launcher
            .launch()
            .map_err(|e| PersistenceError::WorkerUnavailable(e.to_string()))?;

        state.generation += 1;
        let generation = state.generation;
        info!("Launched store worker (generation {})", generation);

        state.worker = Some(WorkerLink {
            generation,
            requests: requests.clone(),
        });
        tokio::spawn(route_responses(Arc::clone(&self.state), generation, responses));

        Ok((generation, requests))
    }
}

/// Deliver each response to whoever is waiting on its id, until the worker goes away
async fn route_responses(
    state: Arc<Mutex<ClientState>>,
    generation: u64,
    mut responses: mpsc::UnboundedReceiver<Response>,
) {
    while let Some(response) = responses.recv().await {
        let mut state = state.lock().await;
        match state.pending.remove(&response.id) {
            Some(call) => {
                let outcome = response.outcome.map_err(PersistenceError::Remote);
                // The caller may have stopped waiting; nothing to do then
                let _ = call.completion.send(outcome);
            }
            None => debug!("Discarding response for unknown request {}", response.id),
        }
    }

    let mut state = state.lock().await;
    let released = state.worker.as_ref().map(|w| w.generation) != Some(generation);
    let orphaned = state.reset_generation(generation);
    if released && orphaned == 0 {
        debug!("Store worker generation {} exited", generation);
    } else {
        error!(
            "Store worker generation {} died; failed {} pending request(s)",
            generation, orphaned
        );
    }
}

fn unexpected(action: &'static str, reply: &Reply) -> PersistenceError {
    PersistenceError::UnexpectedReply {
        action,
        kind: reply.kind(),
    }
}
