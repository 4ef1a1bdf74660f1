use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("block '{name}' has none of 'run', 'run-remotely', 'parallel', or 'for'")]
  UnrecognizedBlock { name: String },

  #[error("for-loop is missing its '{field}' field")]
  MissingLoopField { field: String },

  #[error("for-loop list '{path}' not found in storage")]
  LoopListNotFound { path: String },

  #[error("for-loop list '{path}' does not reference a list")]
  LoopListNotAList { path: String },

  #[error("for-loop list '{path}' item {index} is not a scalar or flat mapping")]
  InvalidLoopItem { path: String, index: usize },

  #[error("remote block '{name}' inside a parallel group must set 'log-into'")]
  UnloggedParallelRemote { name: String },
}
