use std::io;
use std::path::{Path, PathBuf};

use crate::{DirEntry, Metadata, ReadDir, VfsBackend};

/// `VfsBackend` that passes through to the host filesystem via `fs-err`.
#[derive(Default)]
pub struct StdBackend {
    _private: (),
}

impl StdBackend {
    pub fn new() -> StdBackend {
        StdBackend { _private: () }
    }
}

impl VfsBackend for StdBackend {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        fs_err::read(path)
    }

    fn write(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs_err::write(path, data)
    }

    fn exists(&mut self, path: &Path) -> io::Result<bool> {
        std::fs::exists(path)
    }

    fn read_dir(&mut self, path: &Path) -> io::Result<ReadDir> {
        let entries: Result<Vec<_>, _> = fs_err::read_dir(path)?.collect();
        let mut entries = entries?;

        entries.sort_by_cached_key(|entry| entry.file_name());

        let inner = entries
            .into_iter()
            .map(|entry| Ok(DirEntry { path: entry.path() }));

        Ok(ReadDir {
            inner: Box::new(inner),
        })
    }

    fn create_dir(&mut self, path: &Path) -> io::Result<()> {
        fs_err::create_dir(path)
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        fs_err::create_dir_all(path)
    }

    fn metadata(&mut self, path: &Path) -> io::Result<Metadata> {
        let inner = fs_err::metadata(path)?;

        Ok(Metadata {
            is_file: inner.is_file(),
            size: inner.len(),
            mtime: inner.modified().ok(),
        })
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        fs_err::remove_file(path)
    }

    fn remove_dir_all(&mut self, path: &Path) -> io::Result<()> {
        fs_err::remove_dir_all(path)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        fs_err::rename(from, to)
    }

    fn copy(&mut self, from: &Path, to: &Path) -> io::Result<u64> {
        fs_err::copy(from, to)
    }

    fn canonicalize(&mut self, path: &Path) -> io::Result<PathBuf> {
        fs_err::canonicalize(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_dir_is_sorted_by_file_name() {
        let dir = tempdir().unwrap();
        fs_err::write(dir.path().join("zebra.md"), "z").unwrap();
        fs_err::write(dir.path().join("apple.md"), "a").unwrap();

        let mut backend = StdBackend::new();
        let names: Vec<_> = backend
            .read_dir(dir.path())
            .unwrap()
            .map(|entry| {
                entry
                    .unwrap()
                    .path()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();

        assert_eq!(names, ["apple.md", "zebra.md"]);
    }

    #[test]
    fn metadata_reports_size_and_mtime() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs_err::write(&file_path, "12345").unwrap();

        let mut backend = StdBackend::new();
        let meta = backend.metadata(&file_path).unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.len(), 5);
        assert!(meta.modified().is_some());
    }

    #[test]
    fn rename_moves_directories() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("unit");
        fs_err::create_dir(&from).unwrap();
        fs_err::write(from.join("slide.md"), "content").unwrap();

        let mut backend = StdBackend::new();
        let to = dir.path().join("renamed");
        backend.rename(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(
            fs_err::read_to_string(to.join("slide.md")).unwrap(),
            "content"
        );
    }
}
