//! One-shot remote execution: spawn the transport, stream, collect.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, instrument};

use crate::command::build_invocation;
use crate::error::RemoteError;
use crate::sink::{OutputSink, SinkWriter};
use crate::target::RemoteTarget;

/// Outcome of one remote invocation. A non-zero exit is a normal outcome,
/// not an error; errors mean the transport itself failed.
#[derive(Debug, Clone)]
pub struct RemoteOutcome {
  pub exit_code: Option<i32>,
  /// Everything streamed to the sink, captured for reporting.
  pub output: String,
}

impl RemoteOutcome {
  pub fn success(&self) -> bool {
    self.exit_code == Some(0)
  }
}

/// Execute `command` on `target`, streaming output to `sink`.
#[instrument(skip(password, command, sink), fields(target = %target))]
pub async fn execute(
  target: &RemoteTarget,
  password: Option<&str>,
  command: &str,
  sink: &OutputSink,
) -> Result<RemoteOutcome, RemoteError> {
  let (program, args) = build_invocation(target, password, command);
  info!(program, "remote_execution_started");

  let outcome = run_streamed(&program, &args, &target.to_string(), command, sink).await?;

  info!(exit_code = ?outcome.exit_code, "remote_execution_finished");
  Ok(outcome)
}

/// Spawn `program` and stream its output line-by-line to the sink while
/// capturing it. Split out from [`execute`] so the streaming path is
/// exercisable without a reachable SSH host.
pub(crate) async fn run_streamed(
  program: &str,
  args: &[String],
  target: &str,
  command: &str,
  sink: &OutputSink,
) -> Result<RemoteOutcome, RemoteError> {
  let mut writer = SinkWriter::open(sink, target, command).await?;

  let mut child = Command::new(program)
    .args(args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .spawn()
    .map_err(|source| RemoteError::Spawn {
      program: program.to_string(),
      source,
    })?;

  let stdout = child.stdout.take().expect("stdout was piped");
  let stderr = child.stderr.take().expect("stderr was piped");
  let mut out_lines = BufReader::new(stdout).lines();
  let mut err_lines = BufReader::new(stderr).lines();

  let mut captured = String::new();
  let mut out_done = false;
  let mut err_done = false;

  while !(out_done && err_done) {
    tokio::select! {
      line = out_lines.next_line(), if !out_done => {
        match line.map_err(|source| RemoteError::Stream { source })? {
          Some(line) => {
            writer.line(&line).await?;
            captured.push_str(&line);
            captured.push('\n');
          }
          None => out_done = true,
        }
      }
      line = err_lines.next_line(), if !err_done => {
        match line.map_err(|source| RemoteError::Stream { source })? {
          Some(line) => {
            let tagged = format!("[stderr] {line}");
            writer.line(&tagged).await?;
            captured.push_str(&tagged);
            captured.push('\n');
          }
          None => err_done = true,
        }
      }
    }
  }

  let status = child
    .wait()
    .await
    .map_err(|source| RemoteError::Stream { source })?;
  writer.finish(status.code()).await?;

  Ok(RemoteOutcome {
    exit_code: status.code(),
    output: captured,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
  }

  #[tokio::test]
  async fn streams_to_log_file_with_header_and_footer() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("logs").join("run.log");
    let sink = OutputSink::LogFile(log.clone());

    let outcome = run_streamed(
      "sh",
      &args("echo one; echo two >&2; exit 3"),
      "deploy@10.0.0.7",
      "echo one",
      &sink,
    )
    .await
    .unwrap();

    assert_eq!(outcome.exit_code, Some(3));
    assert!(!outcome.success());

    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.contains("=== Remote Session Started ==="));
    assert!(content.contains("Host: deploy@10.0.0.7"));
    assert!(content.contains("one\n"));
    assert!(content.contains("[stderr] two"));
    assert!(content.contains("Command completed with exit status: 3"));
    assert!(content.contains("=== Remote Session Ended ==="));
  }

  #[tokio::test]
  async fn log_file_is_overwritten_per_invocation() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("run.log");
    let sink = OutputSink::LogFile(log.clone());

    run_streamed("sh", &args("echo first"), "t", "c", &sink)
      .await
      .unwrap();
    run_streamed("sh", &args("echo second"), "t", "c", &sink)
      .await
      .unwrap();

    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.contains("second"));
    assert!(!content.contains("first"));
  }

  #[tokio::test]
  async fn captures_output_for_reporting() {
    let tmp = tempfile::tempdir().unwrap();
    let sink = OutputSink::LogFile(tmp.path().join("run.log"));

    let outcome = run_streamed("sh", &args("printf 'a\\nb\\n'"), "t", "c", &sink)
      .await
      .unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.output, "a\nb\n");
  }

  #[tokio::test]
  async fn spawn_failure_is_a_transport_error() {
    let sink = OutputSink::Console;
    let result = run_streamed("definitely-not-a-program", &[], "t", "c", &sink).await;
    assert!(matches!(result, Err(RemoteError::Spawn { .. })));
  }
}
