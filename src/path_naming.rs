//! Derives filesystem names from human-entered titles and resolves name
//! collisions by probing the repository tree.

use std::io;
use std::path::{Path, PathBuf};

use coursefs::Vfs;
use thiserror::Error;

/// Slugs longer than this are truncated before collision probing.
pub const MAX_SLUG_LENGTH: usize = 100;

/// Slug used when a title contains no usable characters at all.
const FALLBACK_SLUG: &str = "untitled";

/// Upper bound on collision probing before giving up.
const MAX_UNIQUE_PROBES: usize = 10_000;

#[derive(Debug, Error)]
pub enum NameError {
    #[error("no collision-free name found for \"{base}\" after {MAX_UNIQUE_PROBES} candidates")]
    CollisionExhausted { base: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Derives a filesystem-safe slug from a title.
///
/// Alphanumeric characters are lowercased; every other run of characters
/// collapses into a single `-`. The result is capped at [`MAX_SLUG_LENGTH`]
/// characters. Titles with no usable characters produce a fixed fallback so
/// the result is never empty.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;

    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            for lowered in ch.to_lowercase() {
                slug.push(lowered);
            }
        } else {
            pending_separator = true;
        }
    }

    if slug.chars().count() > MAX_SLUG_LENGTH {
        slug = slug.chars().take(MAX_SLUG_LENGTH).collect();
    }
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Inputs to [`unique_path`].
pub struct UniquePathRequest<'a> {
    /// Directory the candidate names are probed in.
    pub base_dir: &'a Path,
    /// Already-slugged stem to probe with.
    pub name: &'a str,
    /// File extension without the leading dot, or `None` for directories.
    pub extension: Option<&'a str>,
    /// Path that is allowed to "collide": when a candidate equals this path,
    /// it is returned immediately. This is what makes renaming an entry onto
    /// its own current name a no-op instead of forcing a `-1` suffix.
    pub override_path: Option<&'a Path>,
}

/// Finds the first free path of the form `base/{name}`, `base/{name}-1`,
/// `base/{name}-2`, ... (with the extension appended for files).
///
/// Existence is probed through the Vfs, so renames applied earlier in the
/// same pass are observed. Probing stops after [`MAX_UNIQUE_PROBES`]
/// candidates.
pub fn unique_path(vfs: &Vfs, request: UniquePathRequest<'_>) -> Result<PathBuf, NameError> {
    for copy_number in 0..MAX_UNIQUE_PROBES {
        let suffix = if copy_number == 0 {
            String::new()
        } else {
            format!("-{}", copy_number)
        };

        let file_name = match request.extension {
            Some(ext) => format!("{}{}.{}", request.name, suffix, ext),
            None => format!("{}{}", request.name, suffix),
        };
        let candidate = request.base_dir.join(file_name);

        if let Some(override_path) = request.override_path {
            if candidate == override_path {
                return Ok(candidate);
            }
        }

        if !vfs.exists(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(NameError::CollisionExhausted {
        base: request.name.to_string(),
    })
}
