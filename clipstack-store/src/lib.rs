//! ClipStack Store Library
//!
//! Persists captured clipboard items in SQLite behind an isolated worker.
//! Callers talk to the worker through [`PersistenceClient`], which correlates
//! requests and responses and recovers the worker when it dies.

pub mod client;
pub mod dedup;
pub mod item;
pub mod processor;
pub mod protocol;
#[cfg(unix)]
pub mod server;
pub mod storage;
pub mod worker;

pub use client::{PersistenceClient, PersistenceError};
pub use dedup::{Clock, DedupResult, DuplicatePolicy, ManualClock, SystemClock, DUPLICATE_WINDOW_MS};
pub use item::{ClipboardItem, HistoryFilter, ItemType, HISTORY_LIMIT};
pub use processor::{CommandError, CommandProcessor};
pub use protocol::{Command, RawRequest, Reply, Request, RequestId, Response, DEFAULT_RECENT_LIMIT};
#[cfg(unix)]
pub use server::{HistoryServer, ServerConfig};
pub use storage::{Storage, StorageError, StorageStats};
pub use worker::{StoreLocation, ThreadWorker, WorkerChannels, WorkerLauncher};
