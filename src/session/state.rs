//! Execution state of a session.

use std::fmt;

/// Whether a session currently owns a running command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecState {
    /// No subprocess; commands are accepted.
    #[default]
    Idle,
    /// A command-triggered subprocess is running.
    Executing,
}

impl ExecState {
    /// Check if transition to target state is valid.
    ///
    /// Only `Idle -> Executing` and `Executing -> Idle` are allowed.
    pub fn can_transition_to(&self, target: ExecState) -> bool {
        use ExecState::*;
        matches!((*self, target), (Idle, Executing) | (Executing, Idle))
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `false` and leaves the state unchanged when the transition
    /// is not allowed.
    pub fn transition_to(&mut self, target: ExecState) -> bool {
        if self.can_transition_to(target) {
            *self = target;
            true
        } else {
            false
        }
    }

    /// Check if a new command may start.
    pub fn can_execute(&self) -> bool {
        matches!(self, ExecState::Idle)
    }

    pub fn is_executing(&self) -> bool {
        matches!(self, ExecState::Executing)
    }
}

impl fmt::Display for ExecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecState::Idle => f.write_str("idle"),
            ExecState::Executing => f.write_str("executing"),
        }
    }
}
