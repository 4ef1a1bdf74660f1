//! Output sinks for remote invocations.
//!
//! A remote command streams either to the console or to a per-invocation log
//! file. Log files are overwritten each invocation and carry a timestamped
//! header and an exit-status footer around the live output, so a log is
//! self-describing even when the run that produced it is long gone.

use std::path::PathBuf;

use chrono::Local;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::RemoteError;

/// Where a remote invocation's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
  /// Pass lines through to the console.
  Console,
  /// Write to a log file, created (or truncated) per invocation.
  LogFile(PathBuf),
}

/// An opened sink, ready to receive lines.
pub(crate) enum SinkWriter {
  Console,
  Log { path: PathBuf, file: File },
}

impl SinkWriter {
  /// Open the sink. For log files this creates parent directories, truncates
  /// any previous log, and writes the header.
  pub(crate) async fn open(
    sink: &OutputSink,
    target: &str,
    command: &str,
  ) -> Result<Self, RemoteError> {
    match sink {
      OutputSink::Console => Ok(SinkWriter::Console),
      OutputSink::LogFile(path) => {
        if let Some(parent) = path.parent() {
          if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
              .await
              .map_err(|source| RemoteError::Log {
                path: path.clone(),
                source,
              })?;
          }
        }

        let mut file = File::create(path).await.map_err(|source| RemoteError::Log {
          path: path.clone(),
          source,
        })?;

        let header = format!(
          "=== Remote Session Started ===\nTimestamp: {}\nHost: {}\nCommand: {}\n{}\n\n",
          Local::now().to_rfc3339(),
          target,
          command,
          "=".repeat(50),
        );
        file
          .write_all(header.as_bytes())
          .await
          .map_err(|source| RemoteError::Log {
            path: path.clone(),
            source,
          })?;

        debug!(log = %path.display(), "streaming remote output to log file");
        Ok(SinkWriter::Log {
          path: path.clone(),
          file,
        })
      }
    }
  }

  /// Write one output line.
  pub(crate) async fn line(&mut self, line: &str) -> Result<(), RemoteError> {
    match self {
      SinkWriter::Console => {
        println!("  {line}");
        Ok(())
      }
      SinkWriter::Log { path, file } => {
        let mut buf = line.as_bytes().to_vec();
        buf.push(b'\n');
        file.write_all(&buf).await.map_err(|source| RemoteError::Log {
          path: path.clone(),
          source,
        })?;
        // Flush per line so a tail -f on the log tracks the remote command.
        file.flush().await.map_err(|source| RemoteError::Log {
          path: path.clone(),
          source,
        })
      }
    }
  }

  /// Write the footer and close out the sink.
  pub(crate) async fn finish(&mut self, exit_code: Option<i32>) -> Result<(), RemoteError> {
    match self {
      SinkWriter::Console => Ok(()),
      SinkWriter::Log { path, file } => {
        let status = exit_code
          .map(|c| c.to_string())
          .unwrap_or_else(|| "unknown".to_string());
        let footer = format!(
          "\n{}\nCommand completed with exit status: {}\nTimestamp: {}\n=== Remote Session Ended ===\n",
          "=".repeat(50),
          status,
          Local::now().to_rfc3339(),
        );
        file
          .write_all(footer.as_bytes())
          .await
          .map_err(|source| RemoteError::Log {
            path: path.clone(),
            source,
          })?;
        file.flush().await.map_err(|source| RemoteError::Log {
          path: path.clone(),
          source,
        })
      }
    }
  }
}
