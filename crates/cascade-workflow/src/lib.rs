//! Cascade Workflow
//!
//! This crate provides the "locked" workflow representation for cascade.
//! A locked workflow is the validated, fully-interpolated form of a workflow
//! document, ready for execution.
//!
//! Key differences from `cascade-config`:
//! - `${...}` configuration references are resolved against storage
//! - `for` iteration lists are materialized into concrete values
//! - Block shapes are validated (every block is a command, remote command,
//!   parallel group, or loop)
//! - The parallel-remote logging rule can be checked before anything spawns

mod block;
mod error;
mod expand;
mod resolve;
mod validate;

pub use block::{Block, CommandBlock, LoopBlock, LoopValue, RemoteBlock, Workflow};
pub use error::WorkflowError;
pub use expand::instantiate;
pub use resolve::resolve;
pub use validate::validate;
