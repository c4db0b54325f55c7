//! Job queue state management.
//!
//! The queue is an ordered, duplicate-free list of input file paths.
//! It is locked for the duration of a run; the executor consumes an
//! immutable snapshot so the queue and the worker never share state.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from queue mutation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// Mutation attempted while a run is active.
    #[error("job queue is locked while a run is active")]
    Locked,
}

/// In-memory job queue.
///
/// Insertion order is preserved; inserting a path already present is a
/// no-op. All mutating operations fail with [`QueueError::Locked`] while
/// the queue is locked.
#[derive(Debug, Default)]
pub struct JobQueue {
    /// Items in insertion order, no duplicates.
    items: Vec<PathBuf>,
    /// Set while a run is active.
    locked: bool,
}

impl JobQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Items currently in the queue, in order.
    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }

    /// Number of items in the queue.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if the queue is locked by an active run.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Lock the queue for the duration of a run.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Unlock the queue after a run reaches a terminal state.
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Append each path not already present.
    ///
    /// Returns the number of paths actually added.
    pub fn add<I>(&mut self, paths: I) -> Result<usize, QueueError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        if self.locked {
            return Err(QueueError::Locked);
        }

        let mut added = 0;
        for path in paths {
            if !self.items.contains(&path) {
                self.items.push(path);
                added += 1;
            }
        }

        if added > 0 {
            tracing::debug!("Added {} file(s) to queue ({} total)", added, self.items.len());
        }
        Ok(added)
    }

    /// Remove the given paths if present. Absent paths are ignored.
    ///
    /// Returns the number of paths actually removed.
    pub fn remove(&mut self, paths: &[PathBuf]) -> Result<usize, QueueError> {
        if self.locked {
            return Err(QueueError::Locked);
        }

        let before = self.items.len();
        self.items.retain(|item| !paths.contains(item));
        Ok(before - self.items.len())
    }

    /// Empty the queue.
    pub fn clear(&mut self) -> Result<(), QueueError> {
        if self.locked {
            return Err(QueueError::Locked);
        }
        self.items.clear();
        Ok(())
    }

    /// Check whether a path is already queued.
    pub fn contains(&self, path: &Path) -> bool {
        self.items.iter().any(|item| item == path)
    }

    /// Ordered copy of the queue for the executor to consume.
    ///
    /// Decouples the executor from queue mutation between runs.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.items.clone()
    }
}
