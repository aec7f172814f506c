//! Command representation.

use std::path::PathBuf;

/// Key that interrupts the running command (Ctrl-C).
pub const INTERRUPT_KEY: &str = "\u{3}";

/// Interpreters that exit at once without a terminal unless forced
/// into interactive mode.
const INTERACTIVE_ALIASES: &[(&str, &str)] = &[
    ("node", "node -i"),
    ("python", "python -i"),
    ("python3", "python3 -i"),
];

/// A command line to run through the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The command line to execute.
    pub command_line: String,
    /// Directory the process starts in (inherited when unset).
    pub working_dir: Option<PathBuf>,
}

impl Command {
    /// Create a new command with the given command line.
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            working_dir: None,
        }
    }

    /// Build a command from user input, applying the interactive
    /// interpreter aliases.
    pub fn from_input(input: &str) -> Self {
        let command_line = INTERACTIVE_ALIASES
            .iter()
            .find(|(bare, _)| *bare == input)
            .map(|(_, forced)| forced.to_string())
            .unwrap_or_else(|| input.to_string());
        Self::new(command_line)
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}
