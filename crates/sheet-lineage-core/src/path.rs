//! Workbook path handling
//!
//! Paths reach us from two places: the caller's file system and link targets
//! recorded inside workbooks. The latter are usually Windows paths, even when
//! the workbook is read on another platform, so everything here treats both
//! `/` and `\` as separators and works lexically on the text.

use std::path::{Path, PathBuf};

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Length of a `C:` style drive prefix at the start of `s`, if any.
fn drive_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        2
    } else {
        0
    }
}

/// Whether a path written in either convention is absolute.
pub fn is_absolute(path: &str) -> bool {
    let drive = drive_prefix_len(path);
    path[drive..].starts_with(is_separator)
}

/// Whether `path` is written with Windows conventions
fn is_windows_style(path: &str) -> bool {
    drive_prefix_len(path) > 0 || path.contains('\\')
}

/// Lexically normalize a workbook path.
///
/// Collapses repeated separators, `.` and `..` segments. The output uses `\`
/// when the input looked like a Windows path and `/` otherwise. Nothing is
/// looked up on disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    PathBuf::from(normalize_str(&path.to_string_lossy()))
}

fn normalize_str(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let sep = if is_windows_style(raw) { '\\' } else { '/' };

    let drive = drive_prefix_len(raw);
    let (prefix, rest) = raw.split_at(drive);
    let unc = drive == 0 && (raw.starts_with("\\\\") || raw.starts_with("//"));
    let rooted = rest.starts_with(is_separator);

    let mut parts: Vec<&str> = Vec::new();
    for segment in rest.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().map_or(false, |last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut out = String::with_capacity(raw.len());
    out.push_str(prefix);
    if unc {
        out.push(sep);
        out.push(sep);
    } else if rooted {
        out.push(sep);
    }
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Split a workbook path into `(directory, file name)`.
///
/// The directory has no trailing separator and is empty when the path has no
/// directory part.
pub fn split_workbook_path(path: &Path) -> (String, String) {
    let text = path.to_string_lossy();
    match text.rfind(is_separator) {
        Some(idx) => (text[..idx].to_string(), text[idx + 1..].to_string()),
        None => (String::new(), text.into_owned()),
    }
}

/// The directory part of a workbook path (empty if none)
pub fn workbook_dir(path: &Path) -> String {
    split_workbook_path(path).0
}

/// Join a directory and a relative path, then normalize.
///
/// An absolute `relative` is returned normalized and unchanged otherwise; an
/// empty `dir` leaves `relative` as is.
pub fn join_workbook_path(dir: &str, relative: &str) -> PathBuf {
    if dir.is_empty() || is_absolute(relative) {
        return PathBuf::from(normalize_str(relative));
    }
    let sep = if is_windows_style(dir) { '\\' } else { '/' };
    PathBuf::from(normalize_str(&format!("{}{}{}", dir, sep, relative)))
}
