//! Command processor run by the store worker.
//!
//! Executes one [`Command`] at a time against the [`Storage`] it owns. Every
//! failure is turned into an error [`Response`]; nothing here ends the worker.

use crate::dedup::{Clock, DuplicatePolicy, SystemClock};
use crate::protocol::{Command, RawRequest, Reply, Request, Response};
use crate::storage::{Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Action-level failure, reported back to the caller as `Response.error`
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid item: {0}")]
    InvalidItem(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(serde_json::Error),
}

pub struct CommandProcessor {
    storage: Storage,
    policy: DuplicatePolicy,
    clock: Arc<dyn Clock>,
}

impl CommandProcessor {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
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

    /// Handle a typed request
    pub fn handle(&mut self, request: Request) -> Response {
        let Request { id, command } = request;
        let action = command.action();

        match self.execute(command) {
            Ok(reply) => {
                debug!("Request {} ({}) -> {}", id, action, reply.kind());
                Response::ok(id, reply)
            }
            Err(e) => {
                warn!("Request {} ({}) failed: {}", id, action, e);
                Response::error(id, e.to_string())
            }
        }
    }

    /// Handle a request whose action and payload have not been checked yet
    pub fn handle_raw(&mut self, raw: RawRequest) -> Response {
        let id = raw.id;
        match Request::try_from(raw) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("Request {} rejected: {}", id, e);
                Response::error(id, e.to_string())
            }
        }
    }

    fn execute(&mut self, command: Command) -> Result<Reply, CommandError> {
        match command {
            Command::SaveClipboardItem(item) => {
                let item = item.without_empty_fields();
                item.validate().map_err(CommandError::InvalidItem)?;
                let id = self.storage.insert_item(&item)?;
                Ok(Reply::Saved(id))
            }
            Command::GetClipboardHistory(filter) => {
                let items = self.storage.history(&filter)?;
                Ok(Reply::Items(items))
            }
            Command::IsDuplicateClipboardItem { content } => {
                let prior = self.storage.latest_with_content(&content)?;
                let result = self.policy.check(self.clock.now_millis(), prior.as_ref());
                Ok(Reply::Duplicate(result.is_duplicate()))
            }
            Command::GetRecentItems { limit } => {
                let items = self.storage.recent_items(limit)?;
                Ok(Reply::Items(items))
            }
        }
    }
}
