//! Task Runner (§4.3): allow-listed shell command execution shared by
//! the `mark_passing` verification gate and the Task Runner API's
//! predefined/custom task execution.

pub mod allowlist;
pub mod predefined;
pub mod runner;

pub use allowlist::{validate_command, ALLOWED_COMMANDS};
pub use predefined::{list as predefined_tasks, lookup as lookup_predefined_task};
pub use runner::TaskRunner;
