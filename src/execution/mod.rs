//! Shell command execution.
//!
//! Commands run as plain child processes of the configured shell
//! (`sh -c` by default) with piped standard streams; no pseudo-terminal
//! is allocated. Output arrives as a stream of [`ExecEvent`]s on a
//! bounded channel owned by the caller. A full channel stalls the
//! output readers until the caller catches up. The stream carries:
//!
//! - one [`ExecEvent::Output`] per chunk read, from either stream, in the
//!   order each stream produced them;
//! - exactly one [`ExecEvent::Exited`] after both streams have drained.
//!
//! # Example
//!
//! ```no_run
//! use shell_socket::execution::{Command, ExecEvent, ShellExecutor, EVENT_BUFFER};
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> shell_socket::Result<()> {
//! let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
//! let executor = ShellExecutor::system_default();
//! let process = executor.spawn(&Command::new("echo hello"), tx)?;
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         ExecEvent::Output(chunk) => print!("{}", chunk.text),
//!         ExecEvent::Exited(exit) => {
//!             println!("exit code {:?}", exit.exit_code);
//!             break;
//!         }
//!     }
//! }
//! drop(process);
//! # Ok(())
//! # }
//! ```

mod command;
mod executor;
mod result;

pub use command::{Command, INTERRUPT_KEY};
pub use executor::{ExecEvent, ProcessHandle, ShellExecutor, EVENT_BUFFER};
pub use result::{OutputChunk, OutputSource, ProcessExit};
