//! # shell-socket
//!
//! Interactive remote shell over a persistent WebSocket connection.
//!
//! A client connects, optionally authenticates with HTTP Basic
//! credentials, and then drives one shell-like session: it asks for the
//! prompt, changes directory, requests path completions, runs commands
//! whose output streams back as it is produced, types into a running
//! command, and interrupts it.
//!
//! ## Features
//!
//! - **Shared working directory**: every session of a server sees the
//!   same current directory
//! - **Streaming execution**: stdout and stderr are forwarded chunk by
//!   chunk while the command runs
//! - **Path completion**: naturally sorted candidates for a partial path
//! - **Bounded shutdown**: sessions get a short grace period to close
//!   before they are forcibly stopped
//!
//! ## Quick Start
//!
//! ```no_run
//! use shell_socket::api::{serve, AppState, ServerConfig};
//! use shell_socket::execution::ShellExecutor;
//! use shell_socket::session::ShellEnv;
//! use shell_socket::workspace::WorkingDirectory;
//!
//! #[tokio::main]
//! async fn main() -> shell_socket::Result<()> {
//!     shell_socket::logging::try_init().ok();
//!
//!     let cwd = WorkingDirectory::from_process()?;
//!     let home = cwd.get();
//!     let env = ShellEnv::new(cwd, home, ShellExecutor::system_default());
//!
//!     serve(ServerConfig::new("127.0.0.1", 8099), AppState::new(env)).await
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod security;
pub mod session;
pub mod shutdown;
pub mod workspace;

// Re-export commonly used types
pub use error::{Result, ShellSocketError};
pub use execution::{Command, ExecEvent, ProcessHandle, ShellExecutor};
pub use session::{ExecState, SessionId, SessionRegistry, ShellEnv, ShellSession};
pub use shutdown::ShutdownCoordinator;
pub use workspace::WorkingDirectory;
