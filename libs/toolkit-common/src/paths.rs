//! Workspace path handling shared by the runner and its tests

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolve `input` against `base`
///
/// - Absolute input is returned unchanged
/// - Leading `./` markers are stripped before joining
/// - No `..` folding and no symlink resolution
pub fn resolve_path_from(base: &Path, input: impl AsRef<Path>) -> PathBuf {
    let input = input.as_ref();
    if input.is_absolute() {
        return input.to_path_buf();
    }

    let mut rest = input;
    while let Ok(stripped) = rest.strip_prefix(".") {
        rest = stripped;
    }

    if rest.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(rest)
    }
}

/// Resolve `input` against the process working directory
pub fn resolve_path(input: impl AsRef<Path>) -> Result<PathBuf> {
    let input = input.as_ref();
    if input.is_absolute() {
        return Ok(input.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current working directory")?;
    Ok(resolve_path_from(&cwd, input))
}

/// Fold `.` and `..` components without touching the filesystem
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// True when removing `path` would also remove `dir`: `path` is `dir`
/// itself or one of its ancestors. Compared lexically, symlinks are not
/// followed.
pub fn covers(path: &Path, dir: &Path) -> bool {
    lexical(dir).starts_with(lexical(path))
}

/// Remove every path that exists, in order
///
/// Directories are removed recursively. Absent paths are skipped; any other
/// IO error aborts the sweep.
pub fn cleanup<I, P>(paths: I) -> Result<()>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for path in paths {
        let path = path.as_ref();
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect {}", path.display()))
            }
        };

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };

        match removed {
            Ok(()) => debug!(path = %path.display(), "Removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
        }
    }
    Ok(())
}
