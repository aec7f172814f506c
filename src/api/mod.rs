//! API layer for shell-socket.
//!
//! Serves the interactive shell protocol over WebSocket plus two small
//! HTTP endpoints.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check, never authenticated
//! - `GET /api/info` - Server name, version and live session count
//! - `WS /` and `WS /ws` - Shell session
//!
//! ## Example
//!
//! ```no_run
//! use shell_socket::api::{serve, AppState, ServerConfig};
//! use shell_socket::execution::ShellExecutor;
//! use shell_socket::session::ShellEnv;
//! use shell_socket::workspace::WorkingDirectory;
//!
//! #[tokio::main]
//! async fn main() -> shell_socket::Result<()> {
//!     let cwd = WorkingDirectory::from_process()?;
//!     let env = ShellEnv::new(cwd, "/tmp", ShellExecutor::system_default());
//!     serve(ServerConfig::new("127.0.0.1", 8099), AppState::new(env)).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use handlers::AppState;
pub use router::{
    bind_listener, create_router, serve, serve_listener, shutdown_signal, ServerConfig,
};
pub use types::{ClientMessage, ServerMessage};
