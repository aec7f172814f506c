//! Process output and exit types.

use std::time::Duration;

/// Source of output data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Streaming output chunk from a running process.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    /// Decoded text.
    pub text: String,
    /// Stream source.
    pub source: OutputSource,
}

impl OutputChunk {
    pub fn new(text: impl Into<String>, source: OutputSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    /// Create a stdout chunk.
    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(text, OutputSource::Stdout)
    }

    /// Create a stderr chunk.
    pub fn stderr(text: impl Into<String>) -> Self {
        Self::new(text, OutputSource::Stderr)
    }
}

/// How a process ended.
#[derive(Debug, Clone, Default)]
pub struct ProcessExit {
    /// Exit code, `None` when the process was killed by a signal or
    /// could not be waited on.
    pub exit_code: Option<i32>,
    /// Time from spawn to exit.
    pub duration: Duration,
    /// Whether an interrupt was delivered before exit.
    pub interrupted: bool,
}

impl ProcessExit {
    /// Check if the process succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Decode as much of `pending` as forms complete UTF-8.
///
/// An incomplete multi-byte sequence at the end stays in `pending` for
/// the next read; invalid bytes are replaced.
pub(crate) fn drain_utf8(pending: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut start = 0;

    while start < pending.len() {
        match std::str::from_utf8(&pending[start..]) {
            Ok(valid) => {
                text.push_str(valid);
                start = pending.len();
            }
            Err(e) => {
                let valid = start + e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[start..valid]));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        start = valid + len;
                    }
                    None => {
                        // Incomplete sequence at the end, wait for more bytes.
                        start = valid;
                        break;
                    }
                }
            }
        }
    }

    pending.drain(..start);
    text
}
