//! Repository identity and the session that owns the virtual filesystem for
//! one repository.
//!
//! Every repository lives under a mount point named after its backend, so a
//! repository called `physics-101` stored in the embedded backend is rooted
//! at `/in_memory/physics-101`. Core operations take the repository handle
//! explicitly; there is no ambient "current repository".

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use coursefs::{InMemoryFs, IoResultExt, Vfs, VfsBackend};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Embedded, memory-resident store.
    InMemory,
    /// Host filesystem bridge.
    Local,
}

impl BackendKind {
    /// Directory name this backend's repositories are mounted under.
    pub fn mount_point(&self) -> &'static str {
        match self {
            BackendKind::InMemory => "in_memory",
            BackendKind::Local => "local",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mount_point())
    }
}

/// Identifies one repository on one backend. Cheap to clone and pass around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoAccessObject {
    pub backend_kind: BackendKind,
    pub repo_name: String,
}

impl RepoAccessObject {
    pub fn new(backend_kind: BackendKind, repo_name: impl Into<String>) -> Self {
        Self {
            backend_kind,
            repo_name: repo_name.into(),
        }
    }

    /// Root of this repository's tree: `/{backend}/{name}`.
    pub fn repo_root(&self) -> PathBuf {
        PathBuf::from(format!(
            "/{}/{}",
            self.backend_kind.mount_point(),
            self.repo_name
        ))
    }
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository \"{0}\" not found")]
    NotFound(String),

    #[error("backend for repository \"{0}\" is unavailable")]
    BackendUnavailable(String),

    #[error("a repository-wide copy is already in progress")]
    Busy,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One entry in a recursive folder listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderEntry {
    pub path: PathBuf,
    pub is_file: bool,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<SystemTime>,
}

/// Owns the `Vfs` for one repository and exposes the file operations the
/// mapper and course operations are built on.
pub struct RepoSession {
    repo: RepoAccessObject,
    vfs: Vfs,
    mirror_in_progress: AtomicBool,
}

impl RepoSession {
    /// Opens a session over an existing `Vfs`. The repository root is not
    /// created; use [`RepoSession::init_in_memory`] for that.
    pub fn new<B: VfsBackend>(repo: RepoAccessObject, backend: B) -> Self {
        Self {
            repo,
            vfs: Vfs::new(backend),
            mirror_in_progress: AtomicBool::new(false),
        }
    }

    /// Creates an embedded repository with its root directory in place.
    pub fn init_in_memory(repo_name: impl Into<String>) -> Result<Self, RepoError> {
        let repo = RepoAccessObject::new(BackendKind::InMemory, repo_name);
        let session = Self::new(repo, InMemoryFs::new());
        session.vfs.create_dir_all(session.repo_root())?;
        Ok(session)
    }

    pub fn repo(&self) -> &RepoAccessObject {
        &self.repo
    }

    pub fn repo_root(&self) -> PathBuf {
        self.repo.repo_root()
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    fn ensure_in_repo(&self, path: &Path) -> Result<(), RepoError> {
        if path.starts_with(self.repo_root()) {
            Ok(())
        } else {
            Err(RepoError::NotFound(path.display().to_string()))
        }
    }

    /// Writes a file, creating parent directories as needed.
    pub fn create_file(&self, path: &Path, contents: &[u8]) -> Result<(), RepoError> {
        self.ensure_in_repo(path)?;
        if let Some(parent) = path.parent() {
            self.vfs.create_dir_all(parent)?;
        }
        self.vfs.write(path, contents)?;
        Ok(())
    }

    /// Overwrites an existing file. Unlike [`create_file`](Self::create_file),
    /// the file must already exist.
    pub fn update_file(&self, path: &Path, contents: &[u8]) -> Result<(), RepoError> {
        self.ensure_in_repo(path)?;
        if !self.vfs.exists(path)? {
            return Err(RepoError::NotFound(path.display().to_string()));
        }
        self.vfs.write(path, contents)?;
        Ok(())
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>, RepoError> {
        Ok(self.vfs.read(path)?)
    }

    pub fn create_dir(&self, path: &Path) -> Result<(), RepoError> {
        self.ensure_in_repo(path)?;
        self.vfs.create_dir_all(path)?;
        Ok(())
    }

    pub fn delete_file(&self, path: &Path) -> Result<(), RepoError> {
        self.vfs.remove_file(path)?;
        Ok(())
    }

    pub fn delete_dir(&self, path: &Path) -> Result<(), RepoError> {
        self.vfs.remove_dir_all(path)?;
        Ok(())
    }

    pub fn exists(&self, path: &Path) -> Result<bool, RepoError> {
        Ok(self.vfs.exists(path)?)
    }

    /// Moves a file or directory, creating the destination's parent first.
    pub fn move_path(&self, from: &Path, to: &Path) -> Result<(), RepoError> {
        self.ensure_in_repo(to)?;
        if let Some(parent) = to.parent() {
            self.vfs.create_dir_all(parent)?;
        }
        self.vfs.rename(from, to)?;
        Ok(())
    }

    /// Renames the repository directory itself, updating this session's
    /// handle. Returns the new root.
    pub fn rename_repo(&mut self, new_name: &str) -> Result<PathBuf, RepoError> {
        let old_root = self.repo_root();
        let new_repo = RepoAccessObject::new(self.repo.backend_kind, new_name);
        let new_root = new_repo.repo_root();

        if self.vfs.exists(&new_root)? {
            return Err(RepoError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("repository already exists: {}", new_root.display()),
            )));
        }

        self.vfs.rename(&old_root, &new_root)?;
        self.repo = new_repo;
        Ok(new_root)
    }

    pub fn delete_repo(&self) -> Result<(), RepoError> {
        let root = self.repo_root();
        match self.vfs.remove_dir_all(&root).with_not_found()? {
            Some(()) => Ok(()),
            None => Err(RepoError::NotFound(self.repo.repo_name.clone())),
        }
    }

    /// Recursively lists the repository, skipping `.git`. Directories come
    /// before their contents.
    pub fn folder_structure(&self) -> Result<Vec<FolderEntry>, RepoError> {
        let mut entries = Vec::new();
        self.collect_entries(&self.repo_root(), &mut entries)?;
        Ok(entries)
    }

    fn collect_entries(&self, dir: &Path, out: &mut Vec<FolderEntry>) -> Result<(), RepoError> {
        for entry in self.vfs.read_dir(dir)? {
            let entry = entry?;
            let path = entry.path().to_path_buf();

            if path.file_name().is_some_and(|name| name == ".git") {
                continue;
            }

            let meta = self.vfs.metadata(&path)?;
            let is_file = meta.is_file();
            out.push(FolderEntry {
                path: path.clone(),
                is_file,
                size: meta.len(),
                mtime: meta.modified(),
            });

            if !is_file {
                self.collect_entries(&path, out)?;
            }
        }
        Ok(())
    }

    /// Copies this repository's full tree into `target`, skipping `.git`.
    ///
    /// Only one mirror may run per source session at a time; concurrent calls
    /// get [`RepoError::Busy`]. This is what backs exporting an embedded
    /// repository to the host filesystem.
    pub fn mirror_to(&self, target: &RepoSession) -> Result<(), RepoError> {
        if self.mirror_in_progress.swap(true, Ordering::SeqCst) {
            return Err(RepoError::Busy);
        }

        let result = self.mirror_to_inner(target);
        self.mirror_in_progress.store(false, Ordering::SeqCst);
        result
    }

    fn mirror_to_inner(&self, target: &RepoSession) -> Result<(), RepoError> {
        let source_root = self.repo_root();
        if !self.vfs.exists(&source_root)? {
            return Err(RepoError::NotFound(self.repo.repo_name.clone()));
        }

        let target_root = target.repo_root();
        target.vfs.create_dir_all(&target_root)?;

        let entries = self.folder_structure()?;
        log::debug!(
            "mirroring {} entries from {} to {}",
            entries.len(),
            source_root.display(),
            target_root.display()
        );

        for entry in entries {
            let suffix = entry
                .path
                .strip_prefix(&source_root)
                .map_err(|_| RepoError::NotFound(entry.path.display().to_string()))?;
            let dest = target_root.join(suffix);

            if entry.is_file {
                let contents = self.vfs.read(&entry.path)?;
                target.vfs.write(&dest, contents)?;
            } else {
                target.vfs.create_dir_all(&dest)?;
            }
        }

        Ok(())
    }
}
