//! High-level course operations: creating, renaming, discovering, and
//! loading courses on top of a repository session.

use std::path::PathBuf;

use anyhow::Context;
use coursefs::{IoResultExt, Vfs};

use crate::course::{CourseDocument, Unit, COURSE_META_FILE};
use crate::path_naming::{slugify, unique_path, UniquePathRequest};
use crate::repo::{BackendKind, RepoAccessObject, RepoSession};

/// Creates the metadata file for a brand-new course in the session's
/// repository. Fails if the repository already holds a course.
pub fn create_course(
    session: &RepoSession,
    title: &str,
    description: &str,
) -> anyhow::Result<CourseDocument> {
    let meta_path = session.repo_root().join(COURSE_META_FILE);
    if session.exists(&meta_path)? {
        anyhow::bail!(
            "repository \"{}\" already contains a course",
            session.repo().repo_name
        );
    }

    let document = CourseDocument::new(title, description);
    write_meta(session, &document)?;
    log::info!("created course \"{}\" ({})", document.title, document.id);
    Ok(document)
}

/// Adds a unit to the given block, creating its directory under the
/// repository root. Returns the new unit's directory path.
pub fn create_unit(
    session: &RepoSession,
    document: &mut CourseDocument,
    block_index: usize,
    name: &str,
) -> anyhow::Result<PathBuf> {
    let repo_root = session.repo_root();
    let slug = slugify(name);
    let dir_path = unique_path(
        session.vfs(),
        UniquePathRequest {
            base_dir: &repo_root,
            name: &slug,
            extension: None,
            override_path: None,
        },
    )?;

    session.create_dir(&dir_path)?;

    let block = document
        .blocks
        .get_mut(block_index)
        .with_context(|| format!("no block at index {}", block_index))?;
    block.units.push(Unit {
        name: name.to_string(),
        dir_path: dir_path.clone(),
        slides: Vec::new(),
        extra: Default::default(),
    });

    write_meta(session, document)?;
    Ok(dir_path)
}

/// Renames a course. When the new title slugs to the current repository
/// name this is a title-only edit; otherwise the repository directory moves
/// and every recorded path is rebased onto the new root.
pub fn rename_course(
    session: &mut RepoSession,
    document: &mut CourseDocument,
    new_title: &str,
) -> anyhow::Result<()> {
    document.title = new_title.to_string();

    let new_slug = slugify(new_title);
    if new_slug == session.repo().repo_name {
        write_meta(session, document)?;
        return Ok(());
    }

    let old_root = session.repo_root();
    let new_root = session.rename_repo(&new_slug)?;
    log::info!(
        "renamed course repository {} -> {}",
        old_root.display(),
        new_root.display()
    );

    for block in &mut document.blocks {
        for unit in &mut block.units {
            if let Ok(suffix) = unit.dir_path.strip_prefix(&old_root) {
                unit.dir_path = new_root.join(suffix);
            }
            for slide in &mut unit.slides {
                if let Ok(suffix) = slide.filepath.strip_prefix(&old_root) {
                    slide.filepath = new_root.join(suffix);
                }
            }
        }
    }

    write_meta(session, document)?;
    Ok(())
}

/// Lists the repositories on a backend that contain a course metadata file.
pub fn find_courses(vfs: &Vfs, backend: BackendKind) -> anyhow::Result<Vec<RepoAccessObject>> {
    let mount = PathBuf::from(format!("/{}", backend.mount_point()));

    let entries = match vfs.read_dir(&mount).with_not_found()? {
        Some(entries) => entries,
        None => return Ok(Vec::new()),
    };

    let mut repos = Vec::new();
    for entry in entries {
        let entry = entry?;
        let meta_path = entry.path().join(COURSE_META_FILE);
        if vfs.exists(&meta_path)? {
            let name = entry
                .path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            repos.push(RepoAccessObject::new(backend, name));
        }
    }

    Ok(repos)
}

/// Loads the course from the session's repository, hydrating slide contents
/// from their backing files. Slides whose file is missing keep an empty
/// body and are logged.
pub fn load_course(session: &RepoSession) -> anyhow::Result<CourseDocument> {
    let meta_path = session.repo_root().join(COURSE_META_FILE);
    let yaml = session
        .vfs()
        .read_to_string(&meta_path)
        .with_not_found()?
        .with_context(|| {
            format!(
                "repository \"{}\" has no course metadata",
                session.repo().repo_name
            )
        })?;

    let mut document = CourseDocument::from_yaml(&yaml)
        .with_context(|| format!("invalid course metadata in {}", meta_path.display()))?;

    for block in &mut document.blocks {
        for unit in &mut block.units {
            for slide in &mut unit.slides {
                match session.vfs().read_to_string(&slide.filepath).with_not_found()? {
                    Some(contents) => slide.content = contents,
                    None => {
                        log::warn!(
                            "slide file {} is missing, loading with empty content",
                            slide.filepath.display()
                        );
                    }
                }
            }
        }
    }

    Ok(document)
}

fn write_meta(session: &RepoSession, document: &CourseDocument) -> anyhow::Result<()> {
    let meta_path = session.repo_root().join(COURSE_META_FILE);
    let yaml = document.stripped().to_yaml()?;
    session.create_file(&meta_path, yaml.as_bytes())?;
    Ok(())
}
