use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("invalid remote target '{target}': {message}")]
  InvalidTarget { target: String, message: String },

  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write log file {path}: {source}")]
  Log {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read transport output: {source}")]
  Stream {
    #[source]
    source: std::io::Error,
  },
}
