//! Shared working directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Marker appended to the directory when rendering a prompt.
pub const DEFAULT_PROMPT_SUFFIX: &str = ">";

/// The working directory shared by every session of a server.
///
/// Cloning yields another handle to the same directory.
#[derive(Debug, Clone)]
pub struct WorkingDirectory {
    path: Arc<RwLock<PathBuf>>,
    prompt_suffix: Arc<str>,
}

impl WorkingDirectory {
    /// Create a working directory starting at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(RwLock::new(path.into())),
            prompt_suffix: Arc::from(DEFAULT_PROMPT_SUFFIX),
        }
    }

    /// Start from the directory the process was launched in.
    pub fn from_process() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Use a different prompt marker.
    pub fn with_prompt_suffix(mut self, suffix: impl AsRef<str>) -> Self {
        self.prompt_suffix = Arc::from(suffix.as_ref());
        self
    }

    /// Current directory.
    pub fn get(&self) -> PathBuf {
        // The guarded value is a plain path, a poisoned lock still holds a valid one.
        match self.path.read() {
            Ok(path) => path.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the current directory.
    pub fn set(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        match self.path.write() {
            Ok(mut current) => *current = path,
            Err(poisoned) => *poisoned.into_inner() = path,
        }
    }

    /// Resolve `target` against the current directory.
    ///
    /// Absolute targets are returned unchanged.
    pub fn resolve(&self, target: impl AsRef<Path>) -> PathBuf {
        self.get().join(target)
    }

    /// Render the prompt string: the directory followed by the marker.
    pub fn prompt(&self) -> String {
        format!("{}{}", self.get().display(), self.prompt_suffix)
    }
}
