//! File system traversal and watching.
//!
//! This module provides:
//! - Audio format filtering by extension
//! - Per-root traversal with throttling ([`PathWalker`])
//! - Per-directory watching using notify-rs
//! - Live application of change events to the catalog

mod events;
mod filter;
mod handler;
mod walker;
#[allow(clippy::module_inception)]
mod watcher;

pub use events::{ChangeKind, EventBatch, FileEvent};
pub use filter::{FormatFilter, SUPPORTED_EXTENSIONS};
pub use handler::{EventHandler, WatcherStats, WatcherStatsSnapshot};
pub use walker::{Discoveries, Discovery, MediaWalk, PathWalker, Throttle, WalkReport, WalkStats};
pub use watcher::FileWatcher;
