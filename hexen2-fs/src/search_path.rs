//! The ordered stack of asset sources
//!
//! Resolution consults sources most-overriding first. Entries are only
//! ever removed from the head back down to a previously recorded mark,
//! which keeps teardown linear in the entries removed and makes a mark
//! recorded after bootstrap a permanent floor for the base install.

use pak_format::PakFile;
use std::path::PathBuf;
use tracing::debug;

/// One source of files: a bare directory or an opened packfile
///
/// Entries are owned exclusively by the stack; dropping a pack entry
/// closes its archive handle and frees its directory table.
#[derive(Debug)]
pub enum SearchPath {
    Directory(PathBuf),
    Pack(PakFile),
}

/// Opaque position in the stack, as returned by [`SearchStack::mark`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackMark(pub(crate) usize);

/// Ordered list of [`SearchPath`] entries, most-overriding first
///
/// The head is the most recently pushed entry.
#[derive(Debug, Default)]
pub struct SearchStack {
    entries: Vec<SearchPath>,
}

impl SearchStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a source at the head; it becomes the first one consulted
    pub fn push(&mut self, entry: SearchPath) {
        self.entries.push(entry);
    }

    /// Record the current head position
    pub fn mark(&self) -> StackMark {
        StackMark(self.entries.len())
    }

    /// Pop and destroy every entry above `mark`
    ///
    /// Idempotent when the stack is already at or below the mark. Entries
    /// below a mark are never touched.
    pub fn truncate_to(&mut self, mark: StackMark) {
        while self.entries.len() > mark.0 {
            match self.entries.pop() {
                Some(SearchPath::Pack(pak)) => {
                    debug!("Removed packfile {}", pak.path().display());
                }
                Some(SearchPath::Directory(dir)) => {
                    debug!("Removed path {}", dir.display());
                }
                None => break,
            }
        }
    }

    /// Iterate head to tail (highest priority first)
    pub fn iter(&self) -> impl Iterator<Item = &SearchPath> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
