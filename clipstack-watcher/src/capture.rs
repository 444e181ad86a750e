//! Capture orchestration.
//!
//! Turns clipboard change notifications into stored history: skip empty text,
//! skip repeats, classify, save, then let a visible presentation surface know
//! the history changed.

use crate::classifier::classify;
use async_trait::async_trait;
use clipstack_store::{ClipboardItem, Clock, HistoryFilter, PersistenceClient, PersistenceError, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// One "the clipboard now holds this text" notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardChange {
    pub text: String,
}

/// Push sent to the presentation surface after a save
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEvent<'a> {
    pub event: &'static str,
    pub items: &'a [ClipboardItem],
}

impl<'a> HistoryEvent<'a> {
    pub fn updated(items: &'a [ClipboardItem]) -> Self {
        Self {
            event: "clipboard-updated",
            items,
        }
    }
}

/// The presentation layer as seen from the capture path
#[async_trait]
pub trait HistoryObserver: Send + Sync {
    /// Whether anything is on screen to refresh
    async fn is_visible(&self) -> bool;

    async fn history_changed(&self, items: Vec<ClipboardItem>);
}

/// Observer for headless runs: never visible
pub struct NullObserver;

#[async_trait]
impl HistoryObserver for NullObserver {
    async fn is_visible(&self) -> bool {
        false
    }

    async fn history_changed(&self, _items: Vec<ClipboardItem>) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Nothing to capture
    Ignored,
    /// Same content was captured moments ago
    Duplicate,
    Saved { id: i64, pushed: bool },
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("duplicate check failed: {0}")]
    DuplicateCheck(#[source] PersistenceError),
    #[error("save failed: {0}")]
    Save(#[source] PersistenceError),
    /// The item was stored but the observer could not be refreshed
    #[error("history refresh after saving {id} failed: {source}")]
    Refresh { id: i64, source: PersistenceError },
}

pub struct CaptureOrchestrator {
    client: PersistenceClient,
    observer: Arc<dyn HistoryObserver>,
    clock: Arc<dyn Clock>,
    active_filter: Mutex<HistoryFilter>,
}

impl CaptureOrchestrator {
    pub fn new(client: PersistenceClient, observer: Arc<dyn HistoryObserver>) -> Self {
        Self {
            client,
            observer,
            clock: Arc::new(SystemClock),
            active_filter: Mutex::new(HistoryFilter::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Filter used when pushing history to the observer
    pub async fn set_active_filter(&self, filter: HistoryFilter) {
        *self.active_filter.lock().await = filter;
    }

    /// Run one change through the capture pipeline
    pub async fn handle_change(&self, change: ClipboardChange) -> Result<CaptureOutcome, CaptureError> {
        let ClipboardChange { text } = change;
        if text.is_empty() {
            return Ok(CaptureOutcome::Ignored);
        }

        let duplicate = self
            .client
            .is_duplicate_clipboard_item(text.as_str())
            .await
            .map_err(CaptureError::DuplicateCheck)?;
        if duplicate {
            debug!("Skipping repeated capture ({} chars)", text.len());
            return Ok(CaptureOutcome::Duplicate);
        }

        let classification = classify(&text);
        if let Some(language) = classification.language {
            debug!("Detected {} code", language);
        }
        let item = classification.into_item(text, self.clock.now_millis());
        let item_type = item.item_type;

        let id = self
            .client
            .save_clipboard_item(item)
            .await
            .map_err(CaptureError::Save)?;
        info!("Captured {} item {}", item_type, id);

        if !self.observer.is_visible().await {
            return Ok(CaptureOutcome::Saved { id, pushed: false });
        }

        let filter = self.active_filter.lock().await.clone();
        let items = self
            .client
            .get_clipboard_history(filter)
            .await
            .map_err(|source| CaptureError::Refresh { id, source })?;
        self.observer.history_changed(items).await;

        Ok(CaptureOutcome::Saved { id, pushed: true })
    }

    /// Consume change notifications until the sender side closes
    pub async fn run(&self, mut changes: mpsc::Receiver<ClipboardChange>) {
        info!("Capture loop started");
        while let Some(change) = changes.recv().await {
            if let Err(e) = self.handle_change(change).await {
                warn!("Capture failed: {}", e);
            }
        }
        info!("Capture loop stopped");
    }
}
