//! Backend-independent path decomposition.
//!
//! Paths are plain strings with `/` as the canonical separator, whatever the
//! host OS uses. None of these functions touch storage.

/// The sentinel used for "no path" / the current root.
pub const ROOT: &str = ".";

struct Parsed<'a> {
    absolute: bool,
    segments: Vec<&'a str>,
}

fn parse(path: &str) -> Parsed<'_> {
    let path = path.trim();
    Parsed {
        absolute: path.starts_with('/') || path.starts_with('\\'),
        segments: path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .collect(),
    }
}

fn render(absolute: bool, segments: &[&str]) -> String {
    match (absolute, segments.is_empty()) {
        (true, true) => "/".to_string(),
        (false, true) => ROOT.to_string(),
        (true, false) => format!("/{}", segments.join("/")),
        (false, false) => segments.join("/"),
    }
}

/// Canonical form: `/` separators, no trailing slash, no `.` segments,
/// no repeated separators. An empty path becomes `"."`.
pub fn normalize(path: &str) -> String {
    let parsed = parse(path);
    render(parsed.absolute, &parsed.segments)
}

/// Splits a path into `(directory, basename, extension)`.
///
/// The extension keeps its leading dot and is empty when there is none.
/// Leading dots of a filename belong to the basename (`.env` has no extension).
pub fn split(path: &str) -> (String, String, String) {
    let norm = normalize(path);
    let (directory, filename) = match norm.rfind('/') {
        Some(0) => ("/".to_string(), norm[1..].to_string()),
        Some(idx) => (norm[..idx].to_string(), norm[idx + 1..].to_string()),
        None => (ROOT.to_string(), norm.clone()),
    };
    let (basename, ext) = split_ext(&filename);
    (directory, basename.to_string(), ext.to_string())
}

/// Splits a filename into stem and extension.
pub fn split_ext(filename: &str) -> (&str, &str) {
    let lead = filename.len() - filename.trim_start_matches('.').len();
    match filename[lead..].rfind('.') {
        Some(i) => filename.split_at(lead + i),
        None => (filename, ""),
    }
}

/// The final component of a path.
pub fn file_name(path: &str) -> String {
    let (_, basename, ext) = split(path);
    format!("{}{}", basename, ext)
}

/// Joins parts into one normalized path. An absolute part restarts the
/// path; zero parts yield `"."`.
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let mut absolute = false;
    let mut segments: Vec<&str> = Vec::new();
    for part in parts {
        let parsed = parse(part.as_ref());
        if parsed.absolute {
            absolute = true;
            segments.clear();
        }
        segments.extend(parsed.segments);
    }
    render(absolute, &segments)
}

/// The segments leading from `root` down to `path`.
///
/// Empty when `path` is not under `root` (or equals it).
pub fn rel(root: &str, path: &str) -> Vec<String> {
    let root = parse(root);
    let path = parse(path);
    if root.absolute != path.absolute || root.segments.len() > path.segments.len() {
        return Vec::new();
    }
    if !path.segments.starts_with(&root.segments) {
        return Vec::new();
    }
    path.segments[root.segments.len()..].iter().map(|s| s.to_string()).collect()
}
