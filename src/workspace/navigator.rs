//! Directory navigation (`cd`).

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::WorkingDirectory;

/// In-band `cd` failure, reported to the client as output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// Target is missing or not a directory.
    #[error("cd {0}: No such directory")]
    NoSuchDirectory(String),

    /// Target passed the check but the switch itself failed.
    #[error("cd {0}: Unable to change directory")]
    ChangeFailed(String),
}

/// Split a command line into a `cd` target, if it is one.
///
/// Recognizes `cd` on its own and `cd <target>`. Returns the raw target
/// text (possibly empty or padded).
pub fn parse_cd(command_line: &str) -> Option<&str> {
    if command_line == "cd" {
        Some("")
    } else {
        command_line.strip_prefix("cd ")
    }
}

/// Validates and performs working-directory changes.
#[derive(Debug, Clone)]
pub struct Navigator {
    cwd: WorkingDirectory,
    home: PathBuf,
}

impl Navigator {
    pub fn new(cwd: WorkingDirectory, home: impl Into<PathBuf>) -> Self {
        Self {
            cwd,
            home: home.into(),
        }
    }

    /// Home directory used for an empty target.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Change the shared working directory to `target`.
    ///
    /// An empty or whitespace-only target goes to the home directory.
    /// Relative targets resolve against the current directory. On
    /// failure the working directory is left untouched.
    pub async fn change_directory(&self, target: &str) -> Result<PathBuf, NavigationError> {
        let target = target.trim();
        let shown = if target.is_empty() {
            self.home.display().to_string()
        } else {
            target.to_string()
        };
        let resolved = if target.is_empty() {
            self.home.clone()
        } else {
            self.cwd.resolve(target)
        };

        let checked = shown.clone();
        let outcome = tokio::task::spawn_blocking(move || enter(&resolved, &checked))
            .await
            .unwrap_or_else(|_| Err(NavigationError::ChangeFailed(shown)));

        let path = outcome?;
        debug!(cwd = %path.display(), "working directory changed");
        self.cwd.set(path.clone());
        Ok(path)
    }
}

fn enter(resolved: &Path, shown: &str) -> Result<PathBuf, NavigationError> {
    if !resolved.is_dir() {
        return Err(NavigationError::NoSuchDirectory(shown.to_string()));
    }
    // Checked above, the directory can still vanish or deny access here.
    let canonical = std::fs::canonicalize(resolved)
        .map_err(|_| NavigationError::ChangeFailed(shown.to_string()))?;
    if !searchable(&canonical) {
        return Err(NavigationError::ChangeFailed(shown.to_string()));
    }
    Ok(canonical)
}

/// Entering a directory needs search (execute) permission, not read.
#[cfg(unix)]
fn searchable(dir: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};
    access(dir, AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn searchable(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok()
}
