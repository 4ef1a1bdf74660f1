use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A locked workflow ready for execution. The top-level block list is an
/// implicit sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub name: Option<String>,
  pub blocks: Vec<Block>,
}

/// One node of the workflow tree. The scheduler dispatches on this enum in a
/// single place; no block behavior lives anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
  Command(CommandBlock),
  Remote(RemoteBlock),
  Sequence(Vec<Block>),
  Parallel(Vec<Block>),
  Loop(LoopBlock),
}

/// A local shell command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandBlock {
  pub name: Option<String>,
  pub description: Option<String>,
  pub command: String,
}

impl CommandBlock {
  /// Display name: explicit name, or the command truncated for readability.
  pub fn display_name(&self) -> String {
    match &self.name {
      Some(name) => name.clone(),
      None if self.command.chars().count() > 50 => {
        let preview: String = self.command.chars().take(50).collect();
        format!("{preview}...")
      }
      None => self.command.clone(),
    }
  }
}

/// A command executed on a remote host over SSH.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBlock {
  pub name: Option<String>,
  pub description: Option<String>,
  pub host: String,
  pub user: String,
  pub password: Option<String>,
  pub command: String,
  pub log_file: Option<String>,
}

impl RemoteBlock {
  pub fn display_name(&self) -> String {
    match &self.name {
      Some(name) => name.clone(),
      None => {
        let preview: String = self.command.chars().take(30).collect();
        format!("Remote: {}@{}: {}", self.user, self.host, preview)
      }
    }
  }
}

/// A loop over concrete iteration values, instantiating the body template
/// once per value with the iteration variable bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopBlock {
  /// Name the iteration value is bound to inside the body.
  pub variable: String,
  pub values: Vec<LoopValue>,
  /// Body template; a multi-block body becomes one sequence per iteration.
  pub body: Vec<Block>,
}

/// One iteration value: a scalar, or a flat record addressed as
/// `${var.field}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoopValue {
  Scalar(String),
  Record(BTreeMap<String, String>),
}
