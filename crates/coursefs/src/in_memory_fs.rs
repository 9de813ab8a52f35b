use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::{DirEntry, Metadata, ReadDir, VfsBackend, VfsSnapshot};

/// An in-memory `VfsBackend` with POSIX-like semantics.
///
/// Paths are normalized lexically, so `/a/b/../c` and `/a/c` refer to the
/// same entry. Useful as the embedded repository store and for testing.
#[derive(Default)]
pub struct InMemoryFs {
    entries: BTreeMap<PathBuf, Entry>,
}

enum Entry {
    File { contents: Vec<u8>, mtime: SystemTime },
    Dir,
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(name) => normalized.push(name),
        }
    }

    normalized
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("path not found: {}", path.display()),
    )
}

fn not_a_file(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("not a file: {}", path.display()),
    )
}

fn not_a_dir(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("not a directory: {}", path.display()),
    )
}

impl InMemoryFs {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), Entry::Dir);
        Self { entries }
    }

    /// Load a `VfsSnapshot` at the given path, creating any missing parent
    /// directories.
    pub fn load_snapshot<P: AsRef<Path>>(
        &mut self,
        path: P,
        snapshot: VfsSnapshot,
    ) -> io::Result<()> {
        let path = normalize(path.as_ref());

        for ancestor in path.ancestors().skip(1) {
            match self.entries.get(ancestor) {
                Some(Entry::Dir) | None => {
                    self.entries.insert(ancestor.to_path_buf(), Entry::Dir);
                }
                Some(Entry::File { .. }) => return Err(not_a_dir(ancestor)),
            }
        }

        self.insert_snapshot(path, snapshot);
        Ok(())
    }

    fn insert_snapshot(&mut self, path: PathBuf, snapshot: VfsSnapshot) {
        match snapshot {
            VfsSnapshot::File { contents } => {
                self.entries.insert(
                    path,
                    Entry::File {
                        contents,
                        mtime: SystemTime::now(),
                    },
                );
            }
            VfsSnapshot::Dir { children } => {
                self.entries.insert(path.clone(), Entry::Dir);
                for (name, child) in children {
                    self.insert_snapshot(path.join(name), child);
                }
            }
        }
    }

    fn dir_exists(&self, path: &Path) -> bool {
        matches!(self.entries.get(path), Some(Entry::Dir))
    }

    fn parent_must_exist(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) => {
                if self.dir_exists(parent) {
                    Ok(())
                } else {
                    Err(not_found(parent))
                }
            }
            // The root is always present.
            None => Ok(()),
        }
    }

    fn children_of<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a PathBuf> {
        self.entries
            .keys()
            .filter(move |candidate| candidate.parent() == Some(path))
    }

    fn descendants_of(&self, path: &Path) -> Vec<PathBuf> {
        self.entries
            .keys()
            .filter(|candidate| candidate.starts_with(path))
            .cloned()
            .collect()
    }
}

impl VfsBackend for InMemoryFs {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        let path = normalize(path);
        match self.entries.get(&path) {
            Some(Entry::File { contents, .. }) => Ok(contents.clone()),
            Some(Entry::Dir) => Err(not_a_file(&path)),
            None => Err(not_found(&path)),
        }
    }

    fn write(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        let path = normalize(path);

        if self.dir_exists(&path) {
            return Err(not_a_file(&path));
        }
        self.parent_must_exist(&path)?;

        self.entries.insert(
            path,
            Entry::File {
                contents: data.to_vec(),
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn exists(&mut self, path: &Path) -> io::Result<bool> {
        let path = normalize(path);
        Ok(self.entries.contains_key(&path))
    }

    fn read_dir(&mut self, path: &Path) -> io::Result<ReadDir> {
        let path = normalize(path);
        match self.entries.get(&path) {
            Some(Entry::Dir) => {}
            Some(Entry::File { .. }) => return Err(not_a_dir(&path)),
            None => return Err(not_found(&path)),
        }

        // BTreeMap keys are already sorted, matching StdBackend's ordering.
        let children: Vec<_> = self.children_of(&path).cloned().collect();
        let inner = children.into_iter().map(|path| Ok(DirEntry { path }));

        Ok(ReadDir {
            inner: Box::new(inner),
        })
    }

    fn create_dir(&mut self, path: &Path) -> io::Result<()> {
        let path = normalize(path);

        if self.entries.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("path already exists: {}", path.display()),
            ));
        }
        self.parent_must_exist(&path)?;

        self.entries.insert(path, Entry::Dir);
        Ok(())
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        let path = normalize(path);

        let mut current = PathBuf::from("/");
        for component in path.components().skip(1) {
            current.push(component);
            match self.entries.get(&current) {
                Some(Entry::Dir) => {}
                Some(Entry::File { .. }) => return Err(not_a_dir(&current)),
                None => {
                    self.entries.insert(current.clone(), Entry::Dir);
                }
            }
        }

        Ok(())
    }

    fn metadata(&mut self, path: &Path) -> io::Result<Metadata> {
        let path = normalize(path);
        match self.entries.get(&path) {
            Some(Entry::File { contents, mtime }) => Ok(Metadata {
                is_file: true,
                size: contents.len() as u64,
                mtime: Some(*mtime),
            }),
            Some(Entry::Dir) => Ok(Metadata {
                is_file: false,
                size: 0,
                mtime: None,
            }),
            None => Err(not_found(&path)),
        }
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        match self.entries.get(&path) {
            Some(Entry::File { .. }) => {
                self.entries.remove(&path);
                Ok(())
            }
            Some(Entry::Dir) => Err(not_a_file(&path)),
            None => Err(not_found(&path)),
        }
    }

    fn remove_dir_all(&mut self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        match self.entries.get(&path) {
            Some(Entry::Dir) => {
                for descendant in self.descendants_of(&path) {
                    self.entries.remove(&descendant);
                }
                Ok(())
            }
            Some(Entry::File { .. }) => Err(not_a_dir(&path)),
            None => Err(not_found(&path)),
        }
    }

    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        let from = normalize(from);
        let to = normalize(to);

        if !self.entries.contains_key(&from) {
            return Err(not_found(&from));
        }
        if self.dir_exists(&to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination is a directory: {}", to.display()),
            ));
        }
        self.parent_must_exist(&to)?;

        for old_path in self.descendants_of(&from) {
            let entry = self.entries.remove(&old_path).unwrap();
            let suffix = old_path.strip_prefix(&from).unwrap();
            self.entries.insert(to.join(suffix), entry);
        }

        Ok(())
    }

    fn copy(&mut self, from: &Path, to: &Path) -> io::Result<u64> {
        let from = normalize(from);
        let to = normalize(to);

        let contents = match self.entries.get(&from) {
            Some(Entry::File { contents, .. }) => contents.clone(),
            Some(Entry::Dir) => return Err(not_a_file(&from)),
            None => return Err(not_found(&from)),
        };
        self.parent_must_exist(&to)?;

        let copied = contents.len() as u64;
        self.entries.insert(
            to,
            Entry::File {
                contents,
                mtime: SystemTime::now(),
            },
        );
        Ok(copied)
    }

    fn canonicalize(&mut self, path: &Path) -> io::Result<PathBuf> {
        let path = normalize(path);
        if self.entries.contains_key(&path) {
            Ok(path)
        } else {
            Err(not_found(&path))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn backend_with(path: &str, snapshot: VfsSnapshot) -> InMemoryFs {
        let mut imfs = InMemoryFs::new();
        imfs.load_snapshot(path, snapshot).unwrap();
        imfs
    }

    #[test]
    fn load_snapshot_creates_parents() {
        let mut imfs = backend_with("/a/b/c.txt", VfsSnapshot::file("x"));

        assert!(imfs.exists(Path::new("/a")).unwrap());
        assert!(imfs.exists(Path::new("/a/b")).unwrap());
        assert_eq!(imfs.read(Path::new("/a/b/c.txt")).unwrap(), b"x");
    }

    #[test]
    fn write_requires_parent() {
        let mut imfs = InMemoryFs::new();
        let err = imfs.write(Path::new("/missing/file.txt"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn read_dir_is_sorted() {
        let mut imfs = backend_with(
            "/repo",
            VfsSnapshot::dir([
                ("zebra.md", VfsSnapshot::file("z")),
                ("apple.md", VfsSnapshot::file("a")),
                ("mango", VfsSnapshot::empty_dir()),
            ]),
        );

        let names: Vec<_> = imfs
            .read_dir(Path::new("/repo"))
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

        assert_eq!(names, ["apple.md", "mango", "zebra.md"]);
    }

    #[test]
    fn read_dir_only_returns_direct_children() {
        let mut imfs = backend_with(
            "/repo",
            VfsSnapshot::dir([(
                "unit",
                VfsSnapshot::dir([("slide.md", VfsSnapshot::file("s"))]),
            )]),
        );

        let children: Vec<_> = imfs
            .read_dir(Path::new("/repo"))
            .unwrap()
            .map(|entry| entry.unwrap().path().to_path_buf())
            .collect();

        assert_eq!(children, [PathBuf::from("/repo/unit")]);
    }

    #[test]
    fn remove_dir_all_removes_descendants() {
        let mut imfs = backend_with(
            "/repo/unit",
            VfsSnapshot::dir([("slide.md", VfsSnapshot::file("s"))]),
        );

        imfs.remove_dir_all(Path::new("/repo/unit")).unwrap();

        assert!(!imfs.exists(Path::new("/repo/unit")).unwrap());
        assert!(!imfs.exists(Path::new("/repo/unit/slide.md")).unwrap());
        assert!(imfs.exists(Path::new("/repo")).unwrap());
    }

    #[test]
    fn remove_file_rejects_directories() {
        let mut imfs = backend_with("/repo/unit", VfsSnapshot::empty_dir());
        let err = imfs.remove_file(Path::new("/repo/unit")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn rename_does_not_affect_sibling_prefixes() {
        // "/repo/unit-1" must not be swept up by a rename of "/repo/unit".
        let mut imfs = backend_with(
            "/repo",
            VfsSnapshot::dir([
                ("unit", VfsSnapshot::dir([("a.md", VfsSnapshot::file("a"))])),
                ("unit-1", VfsSnapshot::dir([("b.md", VfsSnapshot::file("b"))])),
            ]),
        );

        imfs.rename(Path::new("/repo/unit"), Path::new("/repo/moved"))
            .unwrap();

        assert!(imfs.exists(Path::new("/repo/unit-1/b.md")).unwrap());
        assert!(imfs.exists(Path::new("/repo/moved/a.md")).unwrap());
        assert!(!imfs.exists(Path::new("/repo/unit")).unwrap());
    }

    #[test]
    fn create_dir_all_is_idempotent() {
        let mut imfs = InMemoryFs::new();
        imfs.create_dir_all(Path::new("/a/b/c")).unwrap();
        imfs.create_dir_all(Path::new("/a/b/c")).unwrap();
        assert!(imfs.exists(Path::new("/a/b/c")).unwrap());
    }
}
