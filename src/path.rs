//! Root path normalization
//!
//! Roots are made absolute and normalized lexically: `.` segments are
//! dropped, `..` pops the previous segment, and trailing separators vanish.
//! Symbolic links are not resolved. Components are handled as `OsStr`, so
//! spaces, parentheses and any other bytes survive untouched.
//!
//! A root nested inside another root is only dropped when the outer walk is
//! certain to reach it; see [`drop_covered_roots`].

use crate::error::ConfigError;
use crate::filter::FilterSet;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Normalize `path` against `cwd` without touching the filesystem
pub fn normalize_lexically(path: &Path, cwd: &Path) -> PathBuf {
    let joined;
    let path = if path.is_absolute() {
        path
    } else {
        joined = cwd.join(path);
        &joined
    };

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if out.parent().is_some() {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Produce the deduplicated, absolute root list for a walk.
///
/// Order of first appearance is kept.
pub fn normalize_roots(paths: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let cwd = std::env::current_dir().map_err(|e| ConfigError::InvalidRoot {
        path: paths[0].clone(),
        reason: format!("cannot resolve working directory: {e}"),
    })?;

    let mut seen = HashSet::with_capacity(paths.len());
    let mut unique = Vec::with_capacity(paths.len());
    for raw in paths {
        let normalized = normalize_lexically(Path::new(raw), &cwd);
        if seen.insert(normalized.clone()) {
            unique.push(normalized);
        }
    }

    Ok(unique)
}

/// Drop roots that another root's walk will already emit.
///
/// A nested root is covered only if the outer root is a walkable directory
/// and every path from just below it down to the nested root is a real
/// entry (not a symlink) that the filters let the walk descend into or
/// report. Anything else stays a root of its own, so nothing requested is
/// lost and nothing is emitted twice.
pub fn drop_covered_roots(roots: Vec<PathBuf>, filters: &FilterSet) -> Vec<PathBuf> {
    let covered: Vec<bool> = roots
        .iter()
        .map(|root| {
            roots
                .iter()
                .any(|outer| outer != root && is_reached_from(outer, root, filters))
        })
        .collect();

    roots
        .into_iter()
        .zip(covered)
        .filter_map(|(root, covered)| (!covered).then_some(root))
        .collect()
}

/// Check whether walking `outer` emits or expands `inner`
fn is_reached_from(outer: &Path, inner: &Path, filters: &FilterSet) -> bool {
    let Ok(rest) = inner.strip_prefix(outer) else {
        return false;
    };

    // Roots are stat'ed through symlinks
    match fs::metadata(outer) {
        Ok(meta) if meta.is_dir() && filters.accepts_root(outer, true) => {}
        _ => return false,
    }

    let mut current = outer.to_path_buf();
    let mut components = rest.components().peekable();
    while let Some(component) = components.next() {
        current.push(component);
        let Ok(meta) = fs::symlink_metadata(&current) else {
            return false;
        };
        let last = components.peek().is_none();

        let reached = if meta.is_dir() {
            filters.accepts_dir(&current)
        } else {
            last && meta.is_file() && filters.accepts_file(&current)
        };
        if !reached {
            return false;
        }
    }
    true
}
