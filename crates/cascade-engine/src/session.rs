//! Emulated shell session state.
//!
//! Each command runs in its own process, so directory changes and exported
//! variables would normally die with it. The session state carries them
//! forward: the executor applies an update after every *successful* command,
//! and every subsequent command is prepared against the updated state.
//!
//! Ownership discipline: exactly one sequential execution path owns a given
//! state at a time. Parallel branches receive clones and their mutations are
//! discarded at the join, so no locking is needed anywhere.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The working directory and exported environment threaded between commands.
#[derive(Debug, Clone)]
pub struct SessionState {
  cwd: PathBuf,
  env: HashMap<String, String>,
}

/// A partial update produced by one completed command.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
  pub cwd: Option<PathBuf>,
  pub env: Vec<EnvChange>,
}

/// One environment change. Removal only ever happens through an explicit
/// `Unset` — a variable absent from an update is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
  Set { name: String, value: String },
  Unset { name: String },
}

impl SessionState {
  /// A session rooted at `cwd`, inheriting this process's environment.
  pub fn new(cwd: impl Into<PathBuf>) -> Self {
    Self {
      cwd: cwd.into(),
      env: std::env::vars().collect(),
    }
  }

  /// A session with an explicit environment (tests, constrained runs).
  pub fn with_environment(cwd: impl Into<PathBuf>, env: HashMap<String, String>) -> Self {
    Self {
      cwd: cwd.into(),
      env,
    }
  }

  pub fn cwd(&self) -> &Path {
    &self.cwd
  }

  pub fn env(&self) -> &HashMap<String, String> {
    &self.env
  }

  pub fn env_var(&self, name: &str) -> Option<&str> {
    self.env.get(name).map(String::as_str)
  }

  /// Merge an update into the state. Called only after a successful command;
  /// a failed command's update must never reach this point.
  pub fn apply(&mut self, update: SessionUpdate) {
    if let Some(cwd) = update.cwd {
      self.cwd = cwd;
    }
    for change in update.env {
      match change {
        EnvChange::Set { name, value } => {
          self.env.insert(name, value);
        }
        EnvChange::Unset { name } => {
          self.env.remove(&name);
        }
      }
    }
  }
}
