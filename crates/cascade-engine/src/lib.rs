//! Cascade Engine
//!
//! The execution engine for cascade workflows. Walks a locked block tree and
//! executes its leaves — local shell commands and remote SSH commands — while
//! emulating a persistent shell session across otherwise independent process
//! invocations.
//!
//! The moving parts:
//! - [`SessionState`]: the emulated working directory + exported environment,
//!   threaded forward through sequential execution, cloned at parallel forks.
//! - Command preparation: each command is wrapped to run from the session's
//!   directory and instrumented with a state-capture footer.
//! - The marker protocol: the footer prints the final directory and the
//!   exported environment between sentinel markers; the executor filters the
//!   markers from the live display but parses them from the captured buffer.
//! - The scheduler: sequences abort on first failure, parallel groups fan out
//!   over isolated session snapshots and always join all branches, loops are
//!   expanded into bound instances before anything is scheduled.

mod capture;
mod error;
mod prepare;
mod process;
mod result;
mod scheduler;
mod session;

pub use error::EngineError;
pub use prepare::PreparedCommand;
pub use result::{BlockResult, BlockStatus, RunReport};
pub use scheduler::{Engine, EngineConfig};
pub use session::{EnvChange, SessionState, SessionUpdate};
