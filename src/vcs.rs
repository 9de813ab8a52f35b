//! The seam between status classification and a concrete version-control
//! backend.
//!
//! [`crate::status::repo_status`] only needs raw `(head, workdir, stage)`
//! rows and the set of conflicted paths, so that is all the trait asks for.
//! Mutating operations (staging, committing, stashing) are backend-specific
//! and live on the provider types themselves.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::repo::RepoAccessObject;

/// One file's raw state as reported by the backend, before classification.
///
/// `path` is relative to the repository root, using forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub path: String,
    pub head: u8,
    pub workdir: u8,
    pub stage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// A commit as surfaced by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub author: Author,
    pub message: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

/// Read-only status source for a repository.
pub trait VcsProvider {
    /// Raw status rows for the repository. `scope` restricts the query to
    /// the given paths; `None` means the whole tree.
    fn status_matrix(
        &self,
        repo: &RepoAccessObject,
        scope: Option<&[PathBuf]>,
    ) -> anyhow::Result<Vec<StatusRow>>;

    /// Paths currently in a merge-conflicted state, relative to the
    /// repository root.
    fn conflicted_paths(&self, repo: &RepoAccessObject) -> anyhow::Result<HashSet<String>>;
}
