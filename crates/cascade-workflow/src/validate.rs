//! Pre-execution workflow validation.
//!
//! The one structural rule with teeth: a remote command anywhere under a
//! parallel group must log to a file. Concurrent remote streams on one
//! console interleave illegibly, so the whole workflow is rejected before
//! any process or transport is spawned.

use crate::block::{Block, Workflow};
use crate::error::WorkflowError;

/// Validate the workflow. Runs before execution; an error here means nothing
/// has been spawned yet.
pub fn validate(workflow: &Workflow) -> Result<(), WorkflowError> {
  for block in &workflow.blocks {
    check_block(block, false)?;
  }
  Ok(())
}

fn check_block(block: &Block, in_parallel: bool) -> Result<(), WorkflowError> {
  match block {
    Block::Command(_) => Ok(()),
    Block::Remote(remote) => {
      if in_parallel && remote.log_file.is_none() {
        return Err(WorkflowError::UnloggedParallelRemote {
          name: remote.display_name(),
        });
      }
      Ok(())
    }
    Block::Sequence(children) => {
      for child in children {
        check_block(child, in_parallel)?;
      }
      Ok(())
    }
    Block::Parallel(children) => {
      for child in children {
        check_block(child, true)?;
      }
      Ok(())
    }
    // Loop bodies are templates; a template without a log file expands to
    // instances without one, so the rule applies to the template directly.
    Block::Loop(l) => {
      for child in &l.body {
        check_block(child, in_parallel)?;
      }
      Ok(())
    }
  }
}
