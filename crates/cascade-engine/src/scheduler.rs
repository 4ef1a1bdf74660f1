//! The block scheduler.
//!
//! Walks the locked block tree with a single dispatch point per block kind.
//! Sequences thread the session state forward child-to-child and abort on the
//! first failure. Parallel groups flatten loop children into one fork, spawn
//! a task per branch over an isolated session snapshot, and always join every
//! branch — a failing sibling never cancels the others, so partial results
//! are always available. After the join, the pre-fork session continues
//! unchanged: branch mutations are deliberately discarded.

use std::path::PathBuf;
use std::sync::Arc;

use cascade_remote::{OutputSink, RemoteError, RemoteOutcome, RemoteTarget};
use cascade_workflow::{Block, CommandBlock, RemoteBlock, Workflow, instantiate, validate};
use chrono::Utc;
use futures::future::{BoxFuture, join_all};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::prepare::prepare;
use crate::process::LocalExecutor;
use crate::result::{BlockResult, BlockStatus, RunReport};
use crate::session::SessionState;

/// Engine configuration.
#[derive(Debug)]
pub struct EngineConfig {
  /// Directory the session starts in; relative log paths resolve against it.
  pub workflow_dir: PathBuf,
  /// Mirror command output to the console as it streams.
  pub echo_output: bool,
}

/// The workflow execution engine.
#[derive(Clone)]
pub struct Engine {
  config: Arc<EngineConfig>,
  executor: LocalExecutor,
}

impl Engine {
  pub fn new(config: EngineConfig) -> Self {
    let executor = LocalExecutor::new(config.echo_output);
    Self {
      config: Arc::new(config),
      executor,
    }
  }

  /// Execute a workflow. The top-level block list is an implicit sequence.
  ///
  /// Validation runs first; a validation error means nothing was spawned.
  /// Block failures are never errors — they surface in the report.
  #[instrument(name = "workflow_execute", skip(self, workflow))]
  pub async fn execute(&self, workflow: &Workflow) -> Result<RunReport, EngineError> {
    validate(workflow)?;

    let execution_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    info!(
      execution_id = %execution_id,
      workflow = workflow.name.as_deref().unwrap_or("<unnamed>"),
      blocks = workflow.blocks.len(),
      "workflow_started"
    );

    let mut session = SessionState::new(&self.config.workflow_dir);
    let mut results = Vec::new();
    let status = self
      .run_sequence(&workflow.blocks, &mut session, &mut results)
      .await?;

    if status.is_success() {
      info!(execution_id = %execution_id, "workflow_completed");
    } else {
      warn!(execution_id = %execution_id, "workflow_failed");
    }

    Ok(RunReport {
      execution_id,
      workflow_name: workflow.name.clone(),
      success: status.is_success(),
      results,
      started_at,
      finished_at: Utc::now(),
    })
  }

  fn run_block<'a>(
    &'a self,
    block: &'a Block,
    session: &'a mut SessionState,
    results: &'a mut Vec<BlockResult>,
  ) -> BoxFuture<'a, Result<BlockStatus, EngineError>> {
    Box::pin(async move {
      match block {
        Block::Command(cmd) => Ok(self.run_command(cmd, session, results).await),
        Block::Remote(remote) => Ok(self.run_remote(remote, results).await),
        Block::Sequence(children) => self.run_sequence(children, session, results).await,
        Block::Parallel(children) => self.run_parallel(children, session, results).await,
        Block::Loop(l) => {
          let expanded = instantiate(l);
          info!(
            variable = %l.variable,
            iterations = expanded.len(),
            "loop_expanded"
          );
          self.run_sequence(&expanded, session, results).await
        }
      }
    })
  }

  /// Run children strictly in order, threading the session forward. The
  /// first failed child aborts the rest; there is no implicit retry.
  async fn run_sequence(
    &self,
    blocks: &[Block],
    session: &mut SessionState,
    results: &mut Vec<BlockResult>,
  ) -> Result<BlockStatus, EngineError> {
    for (index, block) in blocks.iter().enumerate() {
      let status = self.run_block(block, session, results).await?;
      if !status.is_success() {
        let skipped = blocks.len() - index - 1;
        if skipped > 0 {
          warn!(skipped, "sequence_aborted");
        }
        return Ok(BlockStatus::Failed);
      }
    }
    Ok(BlockStatus::Succeeded)
  }

  /// Fork one task per branch, each over its own session snapshot, and join
  /// all of them regardless of individual failure. Loop children expand into
  /// the same fork. Branch session states are dropped at the join; the
  /// caller's session is untouched.
  async fn run_parallel(
    &self,
    children: &[Block],
    session: &SessionState,
    results: &mut Vec<BlockResult>,
  ) -> Result<BlockStatus, EngineError> {
    let mut branches: Vec<Block> = Vec::new();
    for child in children {
      match child {
        Block::Loop(l) => branches.extend(instantiate(l)),
        other => branches.push(other.clone()),
      }
    }

    info!(branches = branches.len(), "parallel_fork");

    let handles: Vec<_> = branches
      .into_iter()
      .map(|block| {
        let engine = self.clone();
        let snapshot = session.clone();
        tokio::spawn(async move { engine.run_branch(block, snapshot).await })
      })
      .collect();

    let mut status = BlockStatus::Succeeded;
    for joined in join_all(handles).await {
      let branch = joined.map_err(|e| EngineError::BranchJoin {
        message: e.to_string(),
      })??;
      let (branch_status, branch_results) = branch;
      results.extend(branch_results);
      if !branch_status.is_success() {
        status = BlockStatus::Failed;
      }
    }

    info!(status = ?status, "parallel_join");
    Ok(status)
  }

  async fn run_branch(
    self,
    block: Block,
    mut session: SessionState,
  ) -> Result<(BlockStatus, Vec<BlockResult>), EngineError> {
    let mut results = Vec::new();
    let status = self.run_block(&block, &mut session, &mut results).await?;
    Ok((status, results))
  }

  async fn run_command(
    &self,
    cmd: &CommandBlock,
    session: &mut SessionState,
    results: &mut Vec<BlockResult>,
  ) -> BlockStatus {
    let name = cmd.display_name();
    info!(block = %name, "block_started");

    let prepared = prepare(&cmd.command, session.cwd());
    let outcome = self.executor.run(&prepared, session).await;

    let status = if outcome.success {
      BlockStatus::Succeeded
    } else {
      BlockStatus::Failed
    };
    let result = BlockResult {
      name,
      host: None,
      status,
      exit_code: outcome.exit_code,
      output: outcome.output,
      error_output: outcome.error_output,
      started_at: outcome.started_at,
      finished_at: outcome.finished_at,
    };

    finish_block(&result);
    results.push(result);
    status
  }

  async fn run_remote(&self, block: &RemoteBlock, results: &mut Vec<BlockResult>) -> BlockStatus {
    let name = block.display_name();
    info!(block = %name, host = %block.host, "block_started");

    let started_at = Utc::now();
    let result = match self.execute_remote(block).await {
      Ok(outcome) => {
        let status = if outcome.success() {
          BlockStatus::Succeeded
        } else {
          BlockStatus::Failed
        };
        BlockResult {
          name,
          host: Some(block.host.clone()),
          status,
          exit_code: outcome.exit_code,
          output: remote_output_summary(block, &outcome),
          error_output: String::new(),
          started_at,
          finished_at: Utc::now(),
        }
      }
      Err(e) => {
        error!(block = %block.display_name(), error = %e, "remote_transport_failed");
        BlockResult {
          name,
          host: Some(block.host.clone()),
          status: BlockStatus::Failed,
          exit_code: None,
          output: String::new(),
          error_output: e.to_string(),
          started_at,
          finished_at: Utc::now(),
        }
      }
    };

    finish_block(&result);
    let status = result.status;
    results.push(result);
    status
  }

  async fn execute_remote(&self, block: &RemoteBlock) -> Result<RemoteOutcome, RemoteError> {
    let target = RemoteTarget::parse(&format!("{}@{}", block.user, block.host))?;
    let sink = match &block.log_file {
      Some(path) => OutputSink::LogFile(self.resolve_log_path(path)),
      None => OutputSink::Console,
    };
    cascade_remote::execute(&target, block.password.as_deref(), &block.command, &sink).await
  }

  fn resolve_log_path(&self, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
      path
    } else {
      self.config.workflow_dir.join(path)
    }
  }
}

fn remote_output_summary(block: &RemoteBlock, outcome: &RemoteOutcome) -> String {
  match &block.log_file {
    Some(log) => format!("log written to {log}"),
    None => outcome.output.clone(),
  }
}

fn finish_block(result: &BlockResult) {
  if result.status.is_success() {
    info!(
      block = %result.name,
      exit_code = ?result.exit_code,
      duration_secs = result.duration_secs(),
      "block_completed"
    );
  } else {
    warn!(
      block = %result.name,
      exit_code = ?result.exit_code,
      duration_secs = result.duration_secs(),
      "block_failed"
    );
  }
}
