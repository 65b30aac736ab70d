//! LSP client coordination and debounced workspace file watching.
//!
//! Each enabled language server gets one [`Client`] (a JSON-RPC 2.0
//! connection over stdio) and one [`Watcher`] (a debounced `notify`-backed
//! filesystem watcher that forwards changes as `didChangeWatchedFiles` or
//! `didChange` notifications).

mod client;
mod diagnostics;
mod preload;
mod watcher;

pub use client::{Client, Error, Notification};
pub use diagnostics::{Diagnostic, DiagnosticSeverity, DiagnosticsStore};
pub use preload::{preload_globs_for, run_preload};
pub use watcher::{WatchedChange, Watcher};
