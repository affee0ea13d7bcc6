//! Path normalization helpers
//!
//! Every include path and source file is compared only after it has been
//! turned into an absolute path with symlinks and `..` collapsed. Manifests
//! routinely reference files that are not checked out, so resolution must not
//! require the target to exist.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base` into an absolute, symlink-free path.
///
/// The longest existing ancestor is canonicalized through the filesystem and
/// the remaining components are applied lexically, so the result is stable
/// whether or not the final target exists.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    for ancestor in joined.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        let Ok(canonical) = std::fs::canonicalize(ancestor) else {
            continue;
        };
        let Ok(tail) = joined.strip_prefix(ancestor) else {
            continue;
        };
        return push_lexically(canonical, tail);
    }

    push_lexically(PathBuf::new(), &joined)
}

/// Resolve `path` relative to the process working directory.
pub fn resolve_from_cwd(path: &Path) -> std::io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(resolve_path(&cwd, path))
}

/// Render a path with forward slashes, the form written into generated artifacts.
pub fn to_posix(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if cfg!(windows) {
        rendered.replace('\\', "/")
    } else {
        rendered.into_owned()
    }
}

fn push_lexically(mut base: PathBuf, tail: &Path) -> PathBuf {
    for component in tail.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                base.pop();
            }
            other => base.push(other.as_os_str()),
        }
    }
    base
}
