//! File system event types and batching.

#![allow(clippy::missing_const_for_fn)]

use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A file or directory appeared (including the new name of a rename).
    Created,
    /// File contents changed.
    Modified,
    /// The path was deleted.
    Removed,
    /// The path was renamed away; the new name arrives as `Created`.
    Renamed,
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileEvent {
    /// Create an event.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// True for events after which the path should be (re)indexed.
    #[must_use]
    pub fn is_upsert(&self) -> bool {
        matches!(self.kind, ChangeKind::Created | ChangeKind::Modified)
    }

    /// Translate a raw `notify` event.
    ///
    /// Access and metadata-only events produce nothing.
    #[must_use]
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        let each = |kind: ChangeKind| -> Vec<Self> {
            event.paths.iter().map(|p| Self::new(p, kind)).collect()
        };

        match event.kind {
            EventKind::Create(_) => each(ChangeKind::Created),
            EventKind::Remove(_) => each(ChangeKind::Removed),
            EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(ChangeKind::Renamed),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
                [from, to] => vec![
                    Self::new(from, ChangeKind::Renamed),
                    Self::new(to, ChangeKind::Created),
                ],
                _ => Vec::new(),
            },
            // Backends that cannot tell which side of a rename a path is on.
            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Renamed
                    };
                    Self::new(p, kind)
                })
                .collect(),
            EventKind::Modify(_) => each(ChangeKind::Modified),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
        }
    }
}

/// Coalesced events ready for processing.
///
/// The last event for a path wins: a path is either pending (re)indexing or
/// pending removal, never both.
#[derive(Debug, Default)]
pub struct EventBatch {
    /// Paths to index.
    pub upserts: Vec<PathBuf>,
    /// Paths to remove from the catalog.
    pub removals: Vec<PathBuf>,
}

impl EventBatch {
    /// Create a new empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event to the batch.
    pub fn add(&mut self, event: FileEvent) {
        if event.is_upsert() {
            remove_path(&mut self.removals, &event.path);
            if !self.upserts.contains(&event.path) {
                self.upserts.push(event.path);
            }
        } else {
            remove_path(&mut self.upserts, &event.path);
            if !self.removals.contains(&event.path) {
                self.removals.push(event.path);
            }
        }
    }

    /// Check if batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    /// Get total number of pending paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.upserts.len() + self.removals.len()
    }
}

fn remove_path(paths: &mut Vec<PathBuf>, path: &Path) {
    paths.retain(|p| p != path);
}
