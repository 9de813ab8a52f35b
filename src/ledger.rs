//! The operation ledger: pending slide operations keyed by file path,
//! collapsed so at most one operation per path survives until the next flush.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Edit,
    Delete,
    /// An add followed by a delete before any flush. Nothing was ever
    /// persisted, so the flush skips these entirely.
    Cancel,
}

/// Pending operations in insertion order, one per path.
///
/// Merge rules when recording against an existing entry:
/// * add always wins (the document state is the source of truth),
/// * edit never downgrades an add,
/// * delete of a never-persisted add cancels it.
#[derive(Debug, Clone, Default)]
pub struct OperationLedger {
    entries: IndexMap<PathBuf, Operation>,
}

impl OperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_add(&mut self, path: impl Into<PathBuf>) {
        self.entries.insert(path.into(), Operation::Add);
    }

    pub fn record_edit(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.entries.get(&path) != Some(&Operation::Add) {
            self.entries.insert(path, Operation::Edit);
        }
    }

    pub fn record_delete(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let operation = if self.entries.get(&path) == Some(&Operation::Add) {
            Operation::Cancel
        } else {
            Operation::Delete
        };
        self.entries.insert(path, operation);
    }

    pub fn get(&self, path: &Path) -> Option<Operation> {
        self.entries.get(path).copied()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, Operation)> {
        self.entries.iter().map(|(path, op)| (path, *op))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns all entries in insertion order.
    pub fn drain(&mut self) -> Vec<(PathBuf, Operation)> {
        self.entries.drain(..).collect()
    }
}
