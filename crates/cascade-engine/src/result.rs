//! Per-block results and the run report.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal state of a block. Composite blocks derive theirs from children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockStatus {
  Succeeded,
  Failed,
}

impl BlockStatus {
  pub fn is_success(self) -> bool {
    matches!(self, BlockStatus::Succeeded)
  }
}

/// Outcome of one executed leaf block, retained for the end-of-run report.
#[derive(Debug, Clone, Serialize)]
pub struct BlockResult {
  pub name: String,
  /// Target host for remote blocks.
  pub host: Option<String>,
  pub status: BlockStatus,
  pub exit_code: Option<i32>,
  pub output: String,
  pub error_output: String,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl BlockResult {
  pub fn duration_secs(&self) -> f64 {
    (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
  }
}

/// Everything a run produced: one result per executed leaf, in completion
/// order for sequences and join order for parallel groups.
#[derive(Debug, Serialize)]
pub struct RunReport {
  pub execution_id: String,
  pub workflow_name: Option<String>,
  pub success: bool,
  pub results: Vec<BlockResult>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl RunReport {
  pub fn total(&self) -> usize {
    self.results.len()
  }

  pub fn succeeded(&self) -> usize {
    self
      .results
      .iter()
      .filter(|r| r.status.is_success())
      .count()
  }

  pub fn failed(&self) -> usize {
    self.total() - self.succeeded()
  }

  pub fn failures(&self) -> impl Iterator<Item = &BlockResult> {
    self.results.iter().filter(|r| !r.status.is_success())
  }

  /// Sum of leaf durations (parallel leaves overlap in wall-clock time).
  pub fn total_duration_secs(&self) -> f64 {
    self.results.iter().map(BlockResult::duration_secs).sum()
  }
}
