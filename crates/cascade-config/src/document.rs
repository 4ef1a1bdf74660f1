//! Raw workflow document types.
//!
//! These mirror the YAML surface syntax one-to-one. A block is discriminated
//! by which of `run`, `run-remotely`, `parallel`, or `for` it carries; the
//! resolver rejects blocks that carry none of them.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// A parsed workflow document.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowDoc {
  pub name: Option<String>,
  #[serde(default)]
  pub blocks: Vec<BlockDef>,
}

/// One entry of the document's `blocks` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockDef {
  pub name: Option<String>,
  pub description: Option<String>,
  pub run: Option<String>,
  #[serde(rename = "run-remotely")]
  pub run_remotely: Option<RemoteDef>,
  pub parallel: Option<ParallelDef>,
  #[serde(rename = "for")]
  pub for_loop: Option<LoopDef>,
}

/// Connection and command details of a `run-remotely` block.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDef {
  pub ip: String,
  pub user: String,
  pub pass: Option<String>,
  pub run: String,
  #[serde(rename = "log-into")]
  pub log_into: Option<String>,
}

/// Body of a `parallel` block: either an explicit list of blocks, or a single
/// `for` map whose iterations become the parallel siblings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParallelDef {
  Blocks(Vec<BlockDef>),
  Loop(ParallelLoopDef),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParallelLoopDef {
  #[serde(rename = "for")]
  pub for_loop: LoopDef,
}

/// A `for` loop definition. The body is either an inline `run`/`run-remotely`
/// or a `blocks` list instantiated once per iteration value.
#[derive(Debug, Clone, Deserialize)]
pub struct LoopDef {
  pub individual: String,
  #[serde(rename = "in")]
  pub list: String,
  pub name: Option<String>,
  pub description: Option<String>,
  pub run: Option<String>,
  #[serde(rename = "run-remotely")]
  pub run_remotely: Option<RemoteDef>,
  pub blocks: Option<Vec<BlockDef>>,
}

/// Load and parse a workflow document from disk.
pub fn load_workflow_doc(path: &Path) -> Result<WorkflowDoc, ConfigError> {
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
    path: path.to_path_buf(),
    message: e.to_string(),
  })
}
