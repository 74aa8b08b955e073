//! Upstream path composition.
//!
//! Joins the target's base path with the trailing request path, keeping
//! exactly one `/` at the seam, then appends the original query.

/// Join two path segments with exactly one separating slash.
///
/// Never returns an empty string.
pub fn join_paths(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) if rest.starts_with('/') => rest.to_string(),
        (true, false) => format!("/{rest}"),
        (false, true) => base.to_string(),
        (false, false) => match (base.ends_with('/'), rest.starts_with('/')) {
            (true, true) => format!("{base}{}", &rest[1..]),
            (false, false) => format!("{base}/{rest}"),
            _ => format!("{base}{rest}"),
        },
    }
}

/// Build the full upstream path-and-query.
///
/// A root base path (`/`) counts as empty so a bare origin does not force a
/// trailing slash onto the trailing path. `query` carries its own leading `?`.
pub fn compose(base_path: &str, remaining_path: &str, query: &str) -> String {
    let base = if base_path == "/" { "" } else { base_path };
    let mut path = join_paths(base, remaining_path);
    path.push_str(query);
    path
}
