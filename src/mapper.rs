//! Flushes the operation ledger to the repository filesystem.
//!
//! A flush is best-effort: each ledger entry is applied independently and a
//! failing entry is logged and skipped, so a single bad path cannot wedge the
//! rest of the batch. The ledger is cleared regardless of how many entries
//! succeeded; retries come from new edits, not replays.

use std::path::PathBuf;

use coursefs::{IoResultExt, Vfs};
use indexmap::IndexSet;

use crate::course::{CourseDocument, COURSE_META_FILE};
use crate::ledger::{Operation, OperationLedger};
use crate::repo::RepoAccessObject;
use crate::tree_sync;

/// Applies every pending ledger operation, renames the tree to match the
/// document, and rewrites the course metadata file.
///
/// Returns the deduplicated set of repository paths that changed, in the
/// order they were touched. Directories are created before files, and the
/// rename pass runs after contents are written so freshly-added slides get
/// their title-derived names in the same flush.
pub fn apply_operations(
    vfs: &Vfs,
    repo: &RepoAccessObject,
    document: &mut CourseDocument,
    ledger: &mut OperationLedger,
) -> Vec<PathBuf> {
    let mut changed: IndexSet<PathBuf> = IndexSet::new();

    let entries = ledger.drain();
    log::debug!("applying {} ledger entr(ies)", entries.len());

    for (path, operation) in entries {
        match operation {
            Operation::Cancel => {}
            Operation::Delete => match delete_path(vfs, &path) {
                Ok(true) => {
                    changed.insert(path);
                }
                Ok(false) => {
                    log::debug!("delete of {} skipped, already gone", path.display());
                }
                Err(err) => {
                    log::error!("failed to delete {}: {}", path.display(), err);
                }
            },
            Operation::Add | Operation::Edit => {
                let contents = match document.find_slide(&path) {
                    Some(slide) => slide.content.clone(),
                    None => {
                        log::warn!(
                            "ledger entry for {} has no slide in the document, skipping",
                            path.display()
                        );
                        continue;
                    }
                };

                let result = path
                    .parent()
                    .map(|parent| vfs.create_dir_all(parent))
                    .unwrap_or(Ok(()))
                    .and_then(|_| vfs.write(&path, contents.as_bytes()));

                match result {
                    Ok(()) => {
                        changed.insert(path);
                    }
                    Err(err) => {
                        log::error!("failed to write {}: {}", path.display(), err);
                    }
                }
            }
        }
    }

    let report = tree_sync::synchronize(vfs, document);
    changed.extend(report.changed_paths);

    let meta_path = repo.repo_root().join(COURSE_META_FILE);
    match document.stripped().to_yaml() {
        Ok(yaml) => match vfs.write(&meta_path, yaml.as_bytes()) {
            Ok(()) => {
                changed.insert(meta_path);
            }
            Err(err) => {
                log::error!(
                    "failed to write course metadata {}: {}",
                    meta_path.display(),
                    err
                );
            }
        },
        Err(err) => {
            log::error!("failed to serialize course metadata: {}", err);
        }
    }

    changed.into_iter().collect()
}

/// Removes a file or directory. `Ok(false)` means the path was already gone.
fn delete_path(vfs: &Vfs, path: &PathBuf) -> std::io::Result<bool> {
    let meta = match vfs.metadata(path).with_not_found()? {
        Some(meta) => meta,
        None => return Ok(false),
    };

    if meta.is_dir() {
        vfs.remove_dir_all(path)?;
    } else {
        vfs.remove_file(path)?;
    }
    Ok(true)
}
