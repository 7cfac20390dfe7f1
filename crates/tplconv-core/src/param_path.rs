/*
 * param_path.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Dot-separated parameter paths.
//!
//! Paths form an implicit tree rooted at the empty path, which is an
//! ancestor of every other path.

/// Strip the last component of `path`; top-level paths yield `""`.
pub fn parent(path: &str) -> &str {
    match path.rfind('.') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Whether `path` lies strictly below `ancestor`.
///
/// Every path is below the empty path.
pub fn is_subpath(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}

/// Iterate over `path` and its ancestors, innermost first, excluding `""`.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(path), |p| Some(parent(p)).filter(|_| !p.is_empty()))
        .filter(|p| !p.is_empty())
}
