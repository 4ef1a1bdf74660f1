//! Cascade Remote
//!
//! One-shot remote command execution. Each invocation opens its own transport
//! (the system `ssh` client, wrapped in `sshpass` when a password is
//! configured), streams output live to a sink — the console or a per-invocation
//! log file — and collects the exit status. There is no session pooling and no
//! remote-control protocol; this is fire-and-collect.
//!
//! When the command text contains a `sudo` invocation and a password is
//! available, the password is piped into `sudo -S` so the operator does not
//! need passwordless escalation configured on the target. This is a runtime
//! convenience, not a security boundary.

mod command;
mod error;
mod exec;
mod sink;
mod target;

pub use command::{build_invocation, inject_sudo_password};
pub use error::RemoteError;
pub use exec::{RemoteOutcome, execute};
pub use sink::OutputSink;
pub use target::RemoteTarget;
