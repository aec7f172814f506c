//! Path completion for partially typed paths.

use std::path::{Path, PathBuf};

use tracing::trace;

use super::{natural_cmp, WorkingDirectory};

/// Resolves path prefixes against the shared working directory.
#[derive(Debug, Clone)]
pub struct Completer {
    cwd: WorkingDirectory,
}

impl Completer {
    pub fn new(cwd: WorkingDirectory) -> Self {
        Self { cwd }
    }

    /// Candidate completions for `pattern`, in natural order.
    ///
    /// The directory listing runs on the blocking pool.
    pub async fn complete(&self, pattern: &str) -> Vec<String> {
        let cwd = self.cwd.get();
        let pattern = pattern.to_string();
        tokio::task::spawn_blocking(move || complete_in(&cwd, &pattern))
            .await
            .unwrap_or_default()
    }
}

/// Complete `pattern` relative to `cwd`.
///
/// Lists the directory the pattern points into and returns every entry
/// re-prefixed with the pattern's directory part, keeping only those
/// that start with the literal pattern text. A pattern that names an
/// unreadable or missing location yields no candidates.
pub fn complete_in(cwd: &Path, pattern: &str) -> Vec<String> {
    let Some((scan_path, prefix)) = scan_target(cwd, pattern) else {
        return Vec::new();
    };

    let Ok(entries) = std::fs::read_dir(&scan_path) else {
        trace!(path = %scan_path.display(), "completion scan failed");
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort_by(|a, b| natural_cmp(a, b));

    names
        .into_iter()
        .map(|name| format!("{}{}", prefix, name))
        .filter(|candidate| pattern.is_empty() || candidate.starts_with(pattern))
        .collect()
}

/// Directory to list and the prefix to re-attach to each entry.
fn scan_target(cwd: &Path, pattern: &str) -> Option<(PathBuf, String)> {
    if pattern.is_empty() {
        return Some((cwd.to_path_buf(), String::new()));
    }

    let dir_part = if cwd.join(pattern).is_dir() {
        pattern.to_string()
    } else {
        dirname(pattern)
    };

    if dir_part.is_empty() {
        return Some((cwd.to_path_buf(), String::new()));
    }

    let scan_path = cwd.join(&dir_part);
    if !scan_path.is_dir() {
        return None;
    }

    let mut prefix = dir_part;
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    Some((scan_path, prefix))
}

/// Directory portion of `pattern`, empty for a bare name.
fn dirname(pattern: &str) -> String {
    match Path::new(pattern).parent() {
        Some(parent) => parent.to_string_lossy().into_owned(),
        None => pattern.to_string(),
    }
}
