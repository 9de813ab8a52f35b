//! Synchronizes in-memory course documents with a repository filesystem and
//! classifies version-control status for the files it manages.
//!
//! The pipeline runs in one direction: mutate the course document, record the
//! per-slide operations in an [`OperationLedger`], then flush everything with
//! [`apply_operations`]. The flush writes slide contents, renames unit
//! directories and slide files so they track their titles, and rewrites the
//! course metadata file. The returned changed-path set can be handed to
//! [`repo_status`] to scope status reconciliation.

pub mod course;
pub mod course_ops;
pub mod git_cli;
pub mod ledger;
pub mod logging;
pub mod mapper;
pub mod path_naming;
pub mod repo;
pub mod status;
pub mod tree_sync;
pub mod vcs;

pub use course::{Block, ContentType, CourseDocument, Slide, Unit, COURSE_META_FILE};
pub use course_ops::{create_course, create_unit, find_courses, load_course, rename_course};
pub use git_cli::GitCliProvider;
pub use ledger::{Operation, OperationLedger};
pub use mapper::apply_operations;
pub use path_naming::{slugify, unique_path, NameError, UniquePathRequest, MAX_SLUG_LENGTH};
pub use repo::{BackendKind, FolderEntry, RepoAccessObject, RepoError, RepoSession};
pub use status::{classify, repo_status, staging_plan, FileStatus, ModifiedFile, StagingPlan};
pub use tree_sync::{synchronize, SyncReport};
pub use vcs::{Author, CommitInfo, StatusRow, VcsProvider};
