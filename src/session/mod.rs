//! Session management module.
//!
//! One [`ShellSession`] exists per connected client. It tracks whether a
//! command is executing, owns the subprocess handle and dispatches
//! client messages. The [`SessionRegistry`] knows every open connection
//! so shutdown can sweep them.

mod id;
mod machine;
mod registry;
mod state;

pub use id::SessionId;
pub use machine::{ShellEnv, ShellSession};
pub use registry::{SessionLink, SessionRegistry, SocketPhase};
pub use state::ExecState;
