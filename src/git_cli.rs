//! Git-backed [`VcsProvider`] that shells out to the `git` binary.
//!
//! Repository paths are virtual (`/local/<name>/...`); the provider maps
//! them onto a real directory by joining the repository name onto its
//! storage root. Only local repositories have a working tree, so in-memory
//! repositories are rejected with [`RepoError::BackendUnavailable`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;

use crate::repo::{BackendKind, RepoAccessObject, RepoError};
use crate::vcs::{Author, CommitInfo, StatusRow, VcsProvider};

/// Field separator for `git log` format strings. Unit separator, which
/// cannot appear in author names or subjects.
const LOG_FIELD_SEP: char = '\u{1f}';

pub struct GitCliProvider {
    root: PathBuf,
}

impl GitCliProvider {
    /// `root` is the directory that holds local repository working trees,
    /// one subdirectory per repository.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn workdir(&self, repo: &RepoAccessObject) -> Result<PathBuf, RepoError> {
        if repo.backend_kind != BackendKind::Local {
            return Err(RepoError::BackendUnavailable(format!(
                "{} has no working tree",
                repo.backend_kind
            )));
        }
        Ok(self.root.join(&repo.repo_name))
    }

    /// Initializes a repository with line-ending config so status output is
    /// stable across platforms.
    pub fn init_repo(&self, repo: &RepoAccessObject) -> anyhow::Result<()> {
        let dir = self.workdir(repo)?;
        fs_err::create_dir_all(&dir)?;

        let init = Command::new("git")
            .arg("init")
            .current_dir(&dir)
            .output()
            .context("Failed to run git init")?;
        if !init.status.success() {
            anyhow::bail!("git init failed: {}", String::from_utf8_lossy(&init.stderr));
        }

        for (key, value) in [
            ("core.autocrlf", "false"),
            ("core.eol", "lf"),
            ("core.safecrlf", "false"),
        ] {
            let _ = Command::new("git")
                .args(["config", "--local", key, value])
                .current_dir(&dir)
                .output();
        }

        Ok(())
    }

    /// Stages the given repository-relative paths.
    pub fn add(&self, repo: &RepoAccessObject, paths: &[String]) -> anyhow::Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let dir = self.workdir(repo)?;

        let output = Command::new("git")
            .arg("add")
            .arg("--")
            .args(paths)
            .current_dir(&dir)
            .output()
            .context("Failed to run git add")?;
        if !output.status.success() {
            anyhow::bail!("git add failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(())
    }

    /// Records the deletion of worktree-deleted paths in the index.
    pub fn remove(&self, repo: &RepoAccessObject, paths: &[String]) -> anyhow::Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let dir = self.workdir(repo)?;

        let output = Command::new("git")
            .args(["rm", "-r", "--ignore-unmatch", "--"])
            .args(paths)
            .current_dir(&dir)
            .output()
            .context("Failed to run git rm")?;
        if !output.status.success() {
            anyhow::bail!("git rm failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(())
    }

    /// Commits whatever is staged.
    pub fn commit(
        &self,
        repo: &RepoAccessObject,
        message: &str,
        author: &Author,
    ) -> anyhow::Result<()> {
        let dir = self.workdir(repo)?;

        let output = Command::new("git")
            .arg("-c")
            .arg(format!("user.name={}", author.name))
            .arg("-c")
            .arg(format!("user.email={}", author.email))
            .args(["commit", "-m", message])
            .current_dir(&dir)
            .output()
            .context("Failed to run git commit")?;
        if !output.status.success() {
            anyhow::bail!(
                "git commit failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        log::info!("Committed: {}", message);
        Ok(())
    }

    /// Stashes worktree changes, including untracked files.
    pub fn stash_push(&self, repo: &RepoAccessObject) -> anyhow::Result<()> {
        let dir = self.workdir(repo)?;

        let output = Command::new("git")
            .args(["stash", "push", "--include-untracked"])
            .current_dir(&dir)
            .output()
            .context("Failed to run git stash push")?;
        if !output.status.success() {
            anyhow::bail!(
                "git stash push failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    /// Re-applies the most recent stash.
    pub fn stash_pop(&self, repo: &RepoAccessObject) -> anyhow::Result<()> {
        let dir = self.workdir(repo)?;

        let output = Command::new("git")
            .args(["stash", "pop"])
            .current_dir(&dir)
            .output()
            .context("Failed to run git stash pop")?;
        if !output.status.success() {
            anyhow::bail!(
                "git stash pop failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    /// Returns the current HEAD commit SHA, or `None` if there are no
    /// commits yet.
    pub fn head_commit(&self, repo: &RepoAccessObject) -> anyhow::Result<Option<String>> {
        let dir = self.workdir(repo)?;

        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&dir)
            .output()
            .context("Failed to run git rev-parse")?;
        if !output.status.success() {
            return Ok(None);
        }

        let hex = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Some(hex))
        } else {
            Ok(None)
        }
    }

    /// The most recent commits, newest first.
    pub fn log(&self, repo: &RepoAccessObject, max: usize) -> anyhow::Result<Vec<CommitInfo>> {
        let dir = self.workdir(repo)?;

        let format = format!(
            "%H{sep}%an{sep}%ae{sep}%at{sep}%s",
            sep = LOG_FIELD_SEP
        );
        let output = Command::new("git")
            .args(["log", "-n"])
            .arg(max.to_string())
            .arg(format!("--format={}", format))
            .current_dir(&dir)
            .output()
            .context("Failed to run git log")?;
        if !output.status.success() {
            // No commits yet.
            return Ok(Vec::new());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_log_line).collect())
    }

    fn scope_args(repo: &RepoAccessObject, scope: Option<&[PathBuf]>) -> Vec<String> {
        let repo_root = repo.repo_root();
        scope
            .unwrap_or(&[])
            .iter()
            .map(|path| {
                let rel = path.strip_prefix(&repo_root).unwrap_or(path);
                rel.to_string_lossy().replace('\\', "/")
            })
            .collect()
    }
}

impl VcsProvider for GitCliProvider {
    fn status_matrix(
        &self,
        repo: &RepoAccessObject,
        scope: Option<&[PathBuf]>,
    ) -> anyhow::Result<Vec<StatusRow>> {
        let dir = self.workdir(repo)?;

        let mut cmd = Command::new("git");
        cmd.args(["status", "--porcelain", "--no-renames", "-uall"])
            .current_dir(&dir);
        let scoped = Self::scope_args(repo, scope);
        if !scoped.is_empty() {
            cmd.arg("--");
            cmd.args(&scoped);
        }

        let output = cmd.output().context("Failed to run git status")?;
        if !output.status.success() {
            anyhow::bail!(
                "git status failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_porcelain(&stdout))
    }

    fn conflicted_paths(&self, repo: &RepoAccessObject) -> anyhow::Result<HashSet<String>> {
        let dir = self.workdir(repo)?;

        let output = Command::new("git")
            .args(["ls-files", "-u"])
            .current_dir(&dir)
            .output()
            .context("Failed to run git ls-files")?;
        if !output.status.success() {
            anyhow::bail!(
                "git ls-files -u failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut paths = HashSet::new();
        for line in stdout.lines() {
            // Format: <mode> <sha1> <stage>\t<path>
            if let Some((_, path)) = line.split_once('\t') {
                paths.insert(path.to_string());
            }
        }
        Ok(paths)
    }
}

/// Parses `git status --porcelain --no-renames -uall` output into raw
/// status rows.
fn parse_porcelain(stdout: &str) -> Vec<StatusRow> {
    let mut rows = Vec::new();
    for line in stdout.lines() {
        if line.len() < 4 {
            continue;
        }
        let xy = &line[..2];
        let path = line[3..].trim_matches('"').to_string();
        let (head, workdir, stage) = xy_to_tuple(xy);
        rows.push(StatusRow {
            path,
            head,
            workdir,
            stage,
        });
    }
    rows
}

/// Maps a porcelain XY code onto a `(head, workdir, stage)` tuple.
///
/// Conflict codes collapse to a plain modification here; conflicts are
/// surfaced separately via `ls-files -u`. Codes with no mapping land on a
/// tuple that classifies as unknown.
fn xy_to_tuple(xy: &str) -> (u8, u8, u8) {
    match xy {
        "??" => (0, 2, 0),
        "A " => (0, 2, 2),
        "AM" => (0, 2, 3),
        "AD" => (0, 0, 3),
        " M" => (1, 2, 1),
        "M " => (1, 2, 2),
        "MM" => (1, 2, 3),
        " D" => (1, 0, 1),
        "D " => (1, 0, 0),
        "UU" | "AA" | "DD" | "AU" | "UA" | "DU" | "UD" => (1, 2, 1),
        _ => (0, 0, 0),
    }
}

fn parse_log_line(line: &str) -> Option<CommitInfo> {
    let mut fields = line.split(LOG_FIELD_SEP);
    let id = fields.next()?.to_string();
    let name = fields.next()?.to_string();
    let email = fields.next()?.to_string();
    let timestamp = fields.next()?.parse().ok()?;
    let message = fields.next()?.to_string();

    Some(CommitInfo {
        id,
        author: Author { name, email },
        message,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{classify, FileStatus};
    use std::fs;
    use tempfile::tempdir;

    fn test_author() -> Author {
        Author {
            name: "Test".to_string(),
            email: "test@test.com".to_string(),
        }
    }

    fn local_repo() -> RepoAccessObject {
        RepoAccessObject::new(BackendKind::Local, "demo")
    }

    /// Creates the repository working tree under `root` and appends a
    /// [user] section so commits work in bare CI environments.
    fn git_init(provider: &GitCliProvider, repo: &RepoAccessObject, root: &Path) {
        provider.init_repo(repo).expect("git init failed");
        let config_path = root.join(&repo.repo_name).join(".git/config");
        let mut content = fs::read_to_string(&config_path).unwrap_or_default();
        content.push_str("[user]\n\tname = Test\n\temail = test@test.com\n");
        fs::write(&config_path, content).unwrap();
    }

    fn row_for<'a>(rows: &'a [StatusRow], path: &str) -> &'a StatusRow {
        rows.iter()
            .find(|row| row.path == path)
            .unwrap_or_else(|| panic!("no status row for {}", path))
    }

    // -----------------------------------------------------------------------
    // parse_porcelain (no git required)
    // -----------------------------------------------------------------------

    #[test]
    fn porcelain_untracked() {
        let rows = parse_porcelain("?? unit-1/new.md\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "unit-1/new.md");
        assert_eq!(classify(rows[0].head, rows[0].workdir, rows[0].stage), FileStatus::Untracked);
    }

    #[test]
    fn porcelain_status_codes() {
        let cases = [
            ("A  a.md", FileStatus::Added),
            ("AM a.md", FileStatus::AddedWithChanges),
            ("AD a.md", FileStatus::AddedThenDeleted),
            (" M a.md", FileStatus::Modified),
            ("M  a.md", FileStatus::Staged),
            ("MM a.md", FileStatus::StagedWithChanges),
            (" D a.md", FileStatus::DeletedUnstaged),
            ("D  a.md", FileStatus::DeletedStaged),
        ];

        for (line, expected) in cases {
            let rows = parse_porcelain(line);
            assert_eq!(rows.len(), 1, "line {:?}", line);
            let status = classify(rows[0].head, rows[0].workdir, rows[0].stage);
            assert_eq!(status, expected, "line {:?}", line);
        }
    }

    #[test]
    fn porcelain_conflict_codes_classify_as_modified() {
        for xy in ["UU", "AA", "DD"] {
            let rows = parse_porcelain(&format!("{} a.md", xy));
            let status = classify(rows[0].head, rows[0].workdir, rows[0].stage);
            assert_eq!(status, FileStatus::Modified, "code {:?}", xy);
        }
    }

    #[test]
    fn porcelain_unknown_code_classifies_unknown() {
        let rows = parse_porcelain("ZZ a.md");
        let status = classify(rows[0].head, rows[0].workdir, rows[0].stage);
        assert_eq!(status, FileStatus::Unknown);
    }

    #[test]
    fn porcelain_skips_short_lines() {
        let rows = parse_porcelain("??\n\n?? ok.md\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "ok.md");
    }

    #[test]
    fn log_line_round_trip() {
        let line = format!(
            "abc123{sep}Test{sep}test@test.com{sep}1724380800{sep}initial import",
            sep = LOG_FIELD_SEP
        );
        let info = parse_log_line(&line).unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.author.name, "Test");
        assert_eq!(info.timestamp, 1724380800);
        assert_eq!(info.message, "initial import");
    }

    // -----------------------------------------------------------------------
    // provider integration (requires git on PATH)
    // -----------------------------------------------------------------------

    #[test]
    fn in_memory_repo_has_no_working_tree() {
        let dir = tempdir().unwrap();
        let provider = GitCliProvider::new(dir.path());
        let repo = RepoAccessObject::new(BackendKind::InMemory, "demo");

        let err = provider.status_matrix(&repo, None).unwrap_err();
        assert!(err.to_string().contains("no working tree"));
    }

    #[test]
    fn status_matrix_lifecycle() {
        let dir = tempdir().unwrap();
        let provider = GitCliProvider::new(dir.path());
        let repo = local_repo();
        git_init(&provider, &repo, dir.path());
        let workdir = dir.path().join("demo");

        fs::write(workdir.join("intro.md"), "v1").unwrap();

        // Untracked before staging.
        let rows = provider.status_matrix(&repo, None).unwrap();
        let row = row_for(&rows, "intro.md");
        assert_eq!(classify(row.head, row.workdir, row.stage), FileStatus::Untracked);

        // Added once staged.
        provider.add(&repo, &["intro.md".to_string()]).unwrap();
        let rows = provider.status_matrix(&repo, None).unwrap();
        let row = row_for(&rows, "intro.md");
        assert_eq!(classify(row.head, row.workdir, row.stage), FileStatus::Added);

        // Clean after commit.
        provider.commit(&repo, "init", &test_author()).unwrap();
        let rows = provider.status_matrix(&repo, None).unwrap();
        assert!(rows.iter().all(|r| r.path != "intro.md"));

        // Modified after an unstaged edit.
        fs::write(workdir.join("intro.md"), "v2").unwrap();
        let rows = provider.status_matrix(&repo, None).unwrap();
        let row = row_for(&rows, "intro.md");
        assert_eq!(classify(row.head, row.workdir, row.stage), FileStatus::Modified);
    }

    #[test]
    fn remove_records_worktree_deletion() {
        let dir = tempdir().unwrap();
        let provider = GitCliProvider::new(dir.path());
        let repo = local_repo();
        git_init(&provider, &repo, dir.path());
        let workdir = dir.path().join("demo");

        fs::write(workdir.join("gone.md"), "content").unwrap();
        provider.add(&repo, &["gone.md".to_string()]).unwrap();
        provider.commit(&repo, "init", &test_author()).unwrap();

        fs::remove_file(workdir.join("gone.md")).unwrap();
        let rows = provider.status_matrix(&repo, None).unwrap();
        let row = row_for(&rows, "gone.md");
        assert_eq!(
            classify(row.head, row.workdir, row.stage),
            FileStatus::DeletedUnstaged
        );

        provider.remove(&repo, &["gone.md".to_string()]).unwrap();
        let rows = provider.status_matrix(&repo, None).unwrap();
        let row = row_for(&rows, "gone.md");
        assert_eq!(
            classify(row.head, row.workdir, row.stage),
            FileStatus::DeletedStaged
        );
    }

    #[test]
    fn status_matrix_scoped_to_changed_paths() {
        let dir = tempdir().unwrap();
        let provider = GitCliProvider::new(dir.path());
        let repo = local_repo();
        git_init(&provider, &repo, dir.path());
        let workdir = dir.path().join("demo");

        fs::write(workdir.join("a.md"), "a").unwrap();
        fs::write(workdir.join("b.md"), "b").unwrap();

        let scope = vec![repo.repo_root().join("a.md")];
        let rows = provider.status_matrix(&repo, Some(&scope)).unwrap();
        assert!(rows.iter().any(|r| r.path == "a.md"));
        assert!(rows.iter().all(|r| r.path != "b.md"));
    }

    #[test]
    fn head_commit_and_log() {
        let dir = tempdir().unwrap();
        let provider = GitCliProvider::new(dir.path());
        let repo = local_repo();
        git_init(&provider, &repo, dir.path());
        let workdir = dir.path().join("demo");

        assert!(provider.head_commit(&repo).unwrap().is_none());
        assert!(provider.log(&repo, 10).unwrap().is_empty());

        fs::write(workdir.join("a.md"), "a").unwrap();
        provider.add(&repo, &["a.md".to_string()]).unwrap();
        provider.commit(&repo, "first", &test_author()).unwrap();

        fs::write(workdir.join("b.md"), "b").unwrap();
        provider.add(&repo, &["b.md".to_string()]).unwrap();
        provider.commit(&repo, "second", &test_author()).unwrap();

        let head = provider.head_commit(&repo).unwrap().unwrap();
        assert_eq!(head.len(), 40);

        let log = provider.log(&repo, 10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "second");
        assert_eq!(log[1].message, "first");
        assert_eq!(log[0].id, head);
        assert_eq!(log[0].author.email, "test@test.com");
    }

    #[test]
    fn stash_round_trip() {
        let dir = tempdir().unwrap();
        let provider = GitCliProvider::new(dir.path());
        let repo = local_repo();
        git_init(&provider, &repo, dir.path());
        let workdir = dir.path().join("demo");

        fs::write(workdir.join("a.md"), "a").unwrap();
        provider.add(&repo, &["a.md".to_string()]).unwrap();
        provider.commit(&repo, "init", &test_author()).unwrap();

        fs::write(workdir.join("a.md"), "dirty").unwrap();
        provider.stash_push(&repo).unwrap();
        assert_eq!(fs::read_to_string(workdir.join("a.md")).unwrap(), "a");

        provider.stash_pop(&repo).unwrap();
        assert_eq!(fs::read_to_string(workdir.join("a.md")).unwrap(), "dirty");
    }

    #[test]
    fn conflicted_paths_empty_on_clean_repo() {
        let dir = tempdir().unwrap();
        let provider = GitCliProvider::new(dir.path());
        let repo = local_repo();
        git_init(&provider, &repo, dir.path());

        assert!(provider.conflicted_paths(&repo).unwrap().is_empty());
    }
}
