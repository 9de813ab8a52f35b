//! Keeps unit directories and slide files named after their titles.
//!
//! Synchronization runs in two phases per unit, outer to inner: first the
//! unit directory is renamed to match the unit's name (which moves every
//! slide under it in one backend rename), then each slide file is renamed to
//! match its title. All expected names go through the collision-probing in
//! [`crate::path_naming`], with the entry's current path as the override so
//! an already-correct name is a no-op.

use std::path::{Path, PathBuf};

use coursefs::Vfs;

use crate::course::{CourseDocument, Unit};
use crate::path_naming::{slugify, unique_path, UniquePathRequest};

/// Default extension for slides whose current path has none.
const DEFAULT_SLIDE_EXTENSION: &str = "md";

/// What a synchronization pass did. A second pass over the same tree must
/// report zero renames.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Backend renames that were issued, in order.
    pub renames: Vec<(PathBuf, PathBuf)>,
    /// Old and new paths of everything that moved, for status scoping.
    pub changed_paths: Vec<PathBuf>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.renames.is_empty()
    }

    fn record_rename(&mut self, from: PathBuf, to: PathBuf) {
        self.changed_paths.push(from.clone());
        self.changed_paths.push(to.clone());
        self.renames.push((from, to));
    }
}

/// Renames unit directories and slide files to track their titles, updating
/// the document's paths in place.
///
/// Units and slides are visited in tree order, so when two siblings slug to
/// the same name the first keeps the bare slug and later ones pick up `-1`,
/// `-2`, ... suffixes. Failures on one entry are logged and skipped so the
/// rest of the tree still converges.
pub fn synchronize(vfs: &Vfs, document: &mut CourseDocument) -> SyncReport {
    let mut report = SyncReport::default();

    for block in &mut document.blocks {
        for unit in &mut block.units {
            sync_unit(vfs, unit, &mut report);
        }
    }

    log::debug!(
        "tree sync: {} rename(s), {} changed path(s)",
        report.renames.len(),
        report.changed_paths.len()
    );

    report
}

fn sync_unit(vfs: &Vfs, unit: &mut Unit, report: &mut SyncReport) {
    let unit_moved = match sync_unit_dir(vfs, unit, report) {
        Ok(moved) => moved,
        Err(err) => {
            log::error!(
                "skipping rename of unit directory {}: {}",
                unit.dir_path.display(),
                err
            );
            false
        }
    };

    for index in 0..unit.slides.len() {
        let dir_path = unit.dir_path.clone();
        let slide = &mut unit.slides[index];

        // When the unit directory moved, the backend already moved the
        // slide's file with it; rebase the recorded path before comparing.
        let current_path = if unit_moved {
            match slide.filepath.file_name() {
                Some(name) => dir_path.join(name),
                None => slide.filepath.clone(),
            }
        } else {
            slide.filepath.clone()
        };

        let extension = current_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_SLIDE_EXTENSION.to_string());
        let slug = slugify(&slide.title);
        let expected = dir_path.join(format!("{}.{}", slug, extension));

        if current_path == expected {
            slide.filepath = current_path;
            continue;
        }

        let target = match unique_path(
            vfs,
            UniquePathRequest {
                base_dir: &dir_path,
                name: &slug,
                extension: Some(&extension),
                override_path: Some(&current_path),
            },
        ) {
            Ok(target) => target,
            Err(err) => {
                log::error!(
                    "skipping rename of slide {}: {}",
                    current_path.display(),
                    err
                );
                slide.filepath = current_path;
                continue;
            }
        };

        if target == current_path {
            slide.filepath = current_path;
            continue;
        }

        match vfs.rename(&current_path, &target) {
            Ok(()) => {
                report.record_rename(current_path, target.clone());
                slide.filepath = target;
            }
            Err(err) => {
                log::error!(
                    "failed to rename slide {} to {}: {}",
                    current_path.display(),
                    target.display(),
                    err
                );
                slide.filepath = current_path;
            }
        }
    }
}

/// Phase one: rename the unit directory to match the unit name. Returns
/// whether the directory actually moved.
fn sync_unit_dir(
    vfs: &Vfs,
    unit: &mut Unit,
    report: &mut SyncReport,
) -> Result<bool, crate::path_naming::NameError> {
    let base_dir = match unit.dir_path.parent() {
        Some(parent) => parent.to_path_buf(),
        None => return Ok(false),
    };

    let slug = slugify(&unit.name);
    let target = unique_path(
        vfs,
        UniquePathRequest {
            base_dir: &base_dir,
            name: &slug,
            extension: None,
            override_path: Some(&unit.dir_path),
        },
    )?;

    if target == unit.dir_path {
        return Ok(false);
    }

    vfs.rename(&unit.dir_path, &target)?;
    report.record_rename(unit.dir_path.clone(), target.clone());
    unit.dir_path = target;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Block, ContentType, Slide};
    use coursefs::{InMemoryFs, VfsSnapshot};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn slide(title: &str, filepath: &str) -> Slide {
        Slide {
            title: title.to_string(),
            filepath: PathBuf::from(filepath),
            content_type: ContentType::Markdown,
            content: String::new(),
        }
    }

    fn unit(name: &str, dir_path: &str, slides: Vec<Slide>) -> Unit {
        Unit {
            name: name.to_string(),
            dir_path: PathBuf::from(dir_path),
            slides,
            extra: BTreeMap::new(),
        }
    }

    fn course(units: Vec<Unit>) -> CourseDocument {
        CourseDocument {
            id: Uuid::nil(),
            title: "Course".to_string(),
            description: String::new(),
            version: "1.0".to_string(),
            blocks: vec![Block {
                name: "Block 1".to_string(),
                description: String::new(),
                units,
            }],
        }
    }

    fn vfs_with(path: &str, snapshot: VfsSnapshot) -> Vfs {
        let mut imfs = InMemoryFs::new();
        imfs.load_snapshot(path, snapshot).unwrap();
        Vfs::new(imfs)
    }

    #[test]
    fn renames_unit_dir_and_rebases_slides() {
        let vfs = vfs_with(
            "/in_memory/demo",
            VfsSnapshot::dir([(
                "Old-AU-Title",
                VfsSnapshot::dir([("intro.md", VfsSnapshot::file("x"))]),
            )]),
        );

        let mut doc = course(vec![unit(
            "New AU Title",
            "/in_memory/demo/Old-AU-Title",
            vec![slide("Intro", "/in_memory/demo/Old-AU-Title/intro.md")],
        )]);

        let report = synchronize(&vfs, &mut doc);

        let unit = &doc.blocks[0].units[0];
        assert_eq!(unit.dir_path, PathBuf::from("/in_memory/demo/new-au-title"));
        assert_eq!(
            unit.slides[0].filepath,
            PathBuf::from("/in_memory/demo/new-au-title/intro.md")
        );
        assert!(vfs
            .exists("/in_memory/demo/new-au-title/intro.md")
            .unwrap());
        assert!(!vfs.exists("/in_memory/demo/Old-AU-Title").unwrap());
        // One directory rename covers the slide move.
        assert_eq!(report.renames.len(), 1);
    }

    #[test]
    fn renames_slide_to_match_title() {
        let vfs = vfs_with(
            "/in_memory/demo/unit-1",
            VfsSnapshot::dir([("draft.md", VfsSnapshot::file("body"))]),
        );

        let mut doc = course(vec![unit(
            "Unit 1",
            "/in_memory/demo/unit-1",
            vec![slide("Final Title", "/in_memory/demo/unit-1/draft.md")],
        )]);

        let report = synchronize(&vfs, &mut doc);

        assert_eq!(
            report.renames,
            vec![(
                PathBuf::from("/in_memory/demo/unit-1/draft.md"),
                PathBuf::from("/in_memory/demo/unit-1/final-title.md"),
            )]
        );
        assert_eq!(
            vfs.read_to_string("/in_memory/demo/unit-1/final-title.md")
                .unwrap(),
            "body"
        );
    }

    #[test]
    fn second_pass_is_noop() {
        let vfs = vfs_with(
            "/in_memory/demo",
            VfsSnapshot::dir([(
                "Old Unit",
                VfsSnapshot::dir([("a.md", VfsSnapshot::file("a"))]),
            )]),
        );

        let mut doc = course(vec![unit(
            "Renamed Unit",
            "/in_memory/demo/Old Unit",
            vec![slide("A", "/in_memory/demo/Old Unit/a.md")],
        )]);

        let first = synchronize(&vfs, &mut doc);
        assert!(!first.is_noop());

        let second = synchronize(&vfs, &mut doc);
        assert!(second.is_noop(), "second pass issued {:?}", second.renames);
        assert!(second.changed_paths.is_empty());
    }

    #[test]
    fn duplicate_slide_titles_suffix_in_tree_order() {
        let vfs = vfs_with(
            "/in_memory/demo/unit-1",
            VfsSnapshot::dir([
                ("first.md", VfsSnapshot::file("1")),
                ("second.md", VfsSnapshot::file("2")),
            ]),
        );

        let mut doc = course(vec![unit(
            "Unit 1",
            "/in_memory/demo/unit-1",
            vec![
                slide("Same Title", "/in_memory/demo/unit-1/first.md"),
                slide("Same Title", "/in_memory/demo/unit-1/second.md"),
            ],
        )]);

        synchronize(&vfs, &mut doc);

        let slides = &doc.blocks[0].units[0].slides;
        assert_eq!(
            slides[0].filepath,
            PathBuf::from("/in_memory/demo/unit-1/same-title.md")
        );
        assert_eq!(
            slides[1].filepath,
            PathBuf::from("/in_memory/demo/unit-1/same-title-1.md")
        );
        assert_eq!(
            vfs.read_to_string("/in_memory/demo/unit-1/same-title.md")
                .unwrap(),
            "1"
        );
        assert_eq!(
            vfs.read_to_string("/in_memory/demo/unit-1/same-title-1.md")
                .unwrap(),
            "2"
        );
    }

    #[test]
    fn suffixed_slide_keeps_its_spot_when_base_taken() {
        // The slide already sits at slide-1.md behind an unrelated slide.md;
        // re-running sync must not move it.
        let vfs = vfs_with(
            "/in_memory/demo/unit-1",
            VfsSnapshot::dir([
                ("slide.md", VfsSnapshot::file("other")),
                ("slide-1.md", VfsSnapshot::file("mine")),
            ]),
        );

        let mut doc = course(vec![unit(
            "Unit 1",
            "/in_memory/demo/unit-1",
            vec![slide("Slide", "/in_memory/demo/unit-1/slide-1.md")],
        )]);

        let report = synchronize(&vfs, &mut doc);

        assert!(report.is_noop());
        assert_eq!(
            doc.blocks[0].units[0].slides[0].filepath,
            PathBuf::from("/in_memory/demo/unit-1/slide-1.md")
        );
    }

    #[test]
    fn duplicate_unit_names_suffix_in_tree_order() {
        let vfs = vfs_with(
            "/in_memory/demo",
            VfsSnapshot::dir([
                ("alpha", VfsSnapshot::empty_dir()),
                ("beta", VfsSnapshot::empty_dir()),
            ]),
        );

        let mut doc = course(vec![
            unit("Shared Name", "/in_memory/demo/alpha", vec![]),
            unit("Shared Name", "/in_memory/demo/beta", vec![]),
        ]);

        synchronize(&vfs, &mut doc);

        assert_eq!(
            doc.blocks[0].units[0].dir_path,
            PathBuf::from("/in_memory/demo/shared-name")
        );
        assert_eq!(
            doc.blocks[0].units[1].dir_path,
            PathBuf::from("/in_memory/demo/shared-name-1")
        );
    }

    #[test]
    fn non_markdown_extension_is_preserved() {
        let vfs = vfs_with(
            "/in_memory/demo/unit-1",
            VfsSnapshot::dir([("check.quiz", VfsSnapshot::file("{}"))]),
        );

        let mut doc = course(vec![unit(
            "Unit 1",
            "/in_memory/demo/unit-1",
            vec![slide("Knowledge Check", "/in_memory/demo/unit-1/check.quiz")],
        )]);

        synchronize(&vfs, &mut doc);

        assert_eq!(
            doc.blocks[0].units[0].slides[0].filepath,
            PathBuf::from("/in_memory/demo/unit-1/knowledge-check.quiz")
        );
    }

    #[test]
    fn missing_backing_file_is_skipped_but_pass_continues() {
        let vfs = vfs_with(
            "/in_memory/demo/unit-1",
            VfsSnapshot::dir([("real.md", VfsSnapshot::file("r"))]),
        );

        let mut doc = course(vec![unit(
            "Unit 1",
            "/in_memory/demo/unit-1",
            vec![
                slide("Ghost Retitled", "/in_memory/demo/unit-1/ghost.md"),
                slide("Renamed Real", "/in_memory/demo/unit-1/real.md"),
            ],
        )]);

        let report = synchronize(&vfs, &mut doc);

        // The ghost rename fails and is skipped; the real one still happens.
        assert_eq!(report.renames.len(), 1);
        assert_eq!(
            doc.blocks[0].units[0].slides[0].filepath,
            PathBuf::from("/in_memory/demo/unit-1/ghost.md")
        );
        assert_eq!(
            doc.blocks[0].units[0].slides[1].filepath,
            PathBuf::from("/in_memory/demo/unit-1/renamed-real.md")
        );
    }
}
