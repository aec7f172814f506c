//! Filesystem side of a shell session.
//!
//! All sessions served by one process share a single [`WorkingDirectory`]:
//! a `cd` in one connection changes the prompt and the spawn directory
//! of every other connection. The value is held explicitly rather than
//! through the OS process directory, so spawned commands receive it as
//! their `current_dir`.

mod completion;
mod cwd;
mod natural;
mod navigator;

pub use completion::{complete_in, Completer};
pub use cwd::{WorkingDirectory, DEFAULT_PROMPT_SUFFIX};
pub use natural::natural_cmp;
pub use navigator::{parse_cd, NavigationError, Navigator};
