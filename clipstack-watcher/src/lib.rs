//! ClipStack watcher - clipboard capture on top of the history store
//!
//! This crate decides what a captured piece of text is and drives it into the
//! store:
//!
//! - **Classifier**: tags text as url, email, code or plain text
//! - **Capture**: de-duplicates, classifies, saves and notifies the presentation layer
//! - **Config**: TOML configuration and storage location
//! - **Daemon**: run loop and shutdown rules of the `clipstack` binary
//!
//! Persistence itself lives in `clipstack-store`.

pub mod capture;
pub mod classifier;
pub mod config;
pub mod daemon;

// Re-export commonly used types
pub use capture::{
    CaptureError, CaptureOrchestrator, CaptureOutcome, ClipboardChange, HistoryEvent, HistoryObserver,
    NullObserver,
};
pub use classifier::{classify, detect_language, Classification, CodeLanguage, CODE_SIGNATURES};
pub use config::{Config, ConfigError, Mode};
pub use daemon::{log_directive, run_until_stopped, StopReason};
