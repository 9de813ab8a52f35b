//! Classifies three-way version-control state tuples into file statuses.
//!
//! Each tracked file is summarized by a `(head, workdir, stage)` tuple:
//!
//! * `head`: 0 = absent from HEAD, 1 = present
//! * `workdir`: 0 = absent, 1 = identical to HEAD, 2 = different
//! * `stage`: 0 = absent, 1 = identical to HEAD, 2 = identical to the
//!   working tree, 3 = different from the working tree
//!
//! Classification is pure and total: tuples outside the known table map to
//! [`FileStatus::Unknown`] instead of panicking, so a provider emitting a
//! state this table never anticipated degrades to "not shown" rather than
//! taking the engine down.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::repo::RepoAccessObject;
use crate::vcs::VcsProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Untracked,
    Added,
    AddedWithChanges,
    Unmodified,
    Modified,
    Staged,
    StagedWithChanges,
    DeletedUnstaged,
    DeletedStaged,
    AddedThenDeleted,
    DeletedStagedWithChanges,
    DeletedStagedWithRename,
    Unknown,
}

impl FileStatus {
    /// Whether this status describes a deletion of some kind.
    pub fn is_deleted(self) -> bool {
        matches!(
            self,
            FileStatus::DeletedUnstaged
                | FileStatus::DeletedStaged
                | FileStatus::DeletedStagedWithChanges
                | FileStatus::DeletedStagedWithRename
                | FileStatus::AddedThenDeleted
        )
    }

    /// Whether the change is already recorded in the stage.
    pub fn is_staged(self) -> bool {
        matches!(
            self,
            FileStatus::Added
                | FileStatus::AddedWithChanges
                | FileStatus::Staged
                | FileStatus::StagedWithChanges
                | FileStatus::DeletedStaged
        )
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FileStatus::Untracked => "untracked",
            FileStatus::Added => "added",
            FileStatus::AddedWithChanges => "added_with_changes",
            FileStatus::Unmodified => "unmodified",
            FileStatus::Modified => "modified",
            FileStatus::Staged => "staged",
            FileStatus::StagedWithChanges => "staged_with_changes",
            FileStatus::DeletedUnstaged => "deleted_unstaged",
            FileStatus::DeletedStaged => "deleted_staged",
            FileStatus::AddedThenDeleted => "added_then_deleted",
            FileStatus::DeletedStagedWithChanges => "deleted_staged_with_changes",
            FileStatus::DeletedStagedWithRename => "deleted_staged_with_rename",
            FileStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Maps a `(head, workdir, stage)` tuple to a status.
pub fn classify(head: u8, workdir: u8, stage: u8) -> FileStatus {
    match (head, workdir, stage) {
        (0, 2, 0) => FileStatus::Untracked,
        (0, 2, 2) => FileStatus::Added,
        (0, 2, 3) => FileStatus::AddedWithChanges,
        (1, 1, 1) => FileStatus::Unmodified,
        (1, 2, 1) => FileStatus::Modified,
        (1, 2, 2) => FileStatus::Staged,
        (1, 2, 3) => FileStatus::StagedWithChanges,
        (1, 0, 1) => FileStatus::DeletedUnstaged,
        (1, 0, 0) => FileStatus::DeletedStaged,
        (0, 0, 3) => FileStatus::AddedThenDeleted,
        (1, 2, 0) => FileStatus::DeletedStagedWithChanges,
        (1, 1, 0) => FileStatus::DeletedStagedWithRename,
        _ => FileStatus::Unknown,
    }
}

/// One changed file, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedFile {
    pub path: String,
    pub status: FileStatus,
    /// Set when the provider reports the path as merge-conflicted. This is
    /// orthogonal to `status`.
    #[serde(default)]
    pub has_merge_conflict: bool,
}

/// Collects the changed files of a repository.
///
/// `scope` limits the query to the given paths (typically the changed-path
/// set returned by a flush). Files classified as unmodified or unknown are
/// filtered out.
pub fn repo_status(
    provider: &dyn VcsProvider,
    repo: &RepoAccessObject,
    scope: Option<&[PathBuf]>,
) -> anyhow::Result<Vec<ModifiedFile>> {
    let rows = provider.status_matrix(repo, scope)?;
    let conflicts = provider.conflicted_paths(repo)?;

    let mut files = Vec::new();
    for row in rows {
        let status = classify(row.head, row.workdir, row.stage);
        if matches!(status, FileStatus::Unmodified | FileStatus::Unknown) {
            continue;
        }

        let has_merge_conflict = conflicts.contains(&row.path);
        files.push(ModifiedFile {
            path: row.path,
            status,
            has_merge_conflict,
        });
    }

    log::debug!("repo status: {} modified file(s)", files.len());
    Ok(files)
}

/// How a set of modified files should be staged.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StagingPlan {
    /// Paths to stage with an add.
    pub to_add: Vec<String>,
    /// Worktree-deleted paths whose deletion must be recorded with a remove.
    pub to_remove: Vec<String>,
}

/// Splits modified files into add/remove sets for a stage-everything action.
///
/// Unstaged deletions need a remove; already-staged deletions need nothing;
/// everything else is staged with an add.
pub fn staging_plan(files: &[ModifiedFile]) -> StagingPlan {
    let mut plan = StagingPlan::default();

    for file in files {
        match file.status {
            FileStatus::DeletedUnstaged => plan.to_remove.push(file.path.clone()),
            FileStatus::DeletedStaged => {}
            _ => plan.to_add.push(file.path.clone()),
        }
    }

    plan
}
