//! Local command execution.
//!
//! One interpreter process per command — no shell is ever kept alive between
//! blocks, which is exactly why the session emulation exists. Output is
//! streamed live (multiplexed readers, not read-after-exit) so progress bars
//! and long builds stay interactive, with marker sections suppressed from the
//! display but kept in the captured buffer for state extraction.

use std::process::Stdio;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::capture::{self, OutputFilter};
use crate::prepare::PreparedCommand;
use crate::session::SessionState;

/// Outcome of one local command. Spawn failures land here too, as failed
/// outcomes with the error text in `error_output` — the scheduler treats them
/// like any other failing command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
  pub success: bool,
  pub exit_code: Option<i32>,
  /// Captured stdout with marker sections removed.
  pub output: String,
  pub error_output: String,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

/// Spawns interpreter processes and applies their state capture to the
/// session.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
  /// Mirror display-safe output lines to the console as they arrive.
  echo: bool,
}

impl LocalExecutor {
  pub fn new(echo: bool) -> Self {
    Self { echo }
  }

  /// Run a prepared command. On success (exit 0) the session is updated from
  /// the captured markers, falling back to the pre-calculated directory
  /// hint; on failure the session is left exactly as it was.
  pub async fn run(
    &self,
    prepared: &PreparedCommand,
    session: &mut SessionState,
  ) -> CommandOutcome {
    let started_at = Utc::now();
    debug!(command = %prepared.raw, cwd = %session.cwd().display(), "spawning command");

    match self.spawn_and_stream(prepared, session).await {
      Ok((exit_code, stdout, stderr)) => {
        let success = exit_code == Some(0);
        let sections = capture::split_sections(&stdout);

        if success {
          session.apply(capture::state_update(&sections, prepared.target_hint.as_ref()));
        }

        CommandOutcome {
          success,
          exit_code,
          output: sections.clean,
          error_output: stderr,
          started_at,
          finished_at: Utc::now(),
        }
      }
      Err(e) => {
        warn!(command = %prepared.raw, error = %e, "command execution failed");
        CommandOutcome {
          success: false,
          exit_code: None,
          output: String::new(),
          error_output: format!("command execution failed: {e}"),
          started_at,
          finished_at: Utc::now(),
        }
      }
    }
  }

  async fn spawn_and_stream(
    &self,
    prepared: &PreparedCommand,
    session: &SessionState,
  ) -> std::io::Result<(Option<i32>, String, String)> {
    let mut child = Command::new("/bin/bash")
      .arg("-c")
      .arg(&prepared.script)
      .env_clear()
      .envs(session.env())
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    // Drain both pipes concurrently while the child runs; a full pipe would
    // otherwise deadlock a chatty command against `wait()`.
    let echo = self.echo;
    let out_task = tokio::spawn(read_stdout(stdout, echo));
    let err_task = tokio::spawn(read_stderr(stderr, echo));

    let status = child.wait().await?;
    let stdout_full = join_reader(out_task).await?;
    let stderr_full = join_reader(err_task).await?;

    Ok((status.code(), stdout_full, stderr_full))
  }
}

async fn join_reader(
  task: tokio::task::JoinHandle<std::io::Result<String>>,
) -> std::io::Result<String> {
  task
    .await
    .map_err(|e| std::io::Error::other(format!("output reader task failed: {e}")))?
}

async fn read_stdout(reader: impl AsyncRead + Unpin, echo: bool) -> std::io::Result<String> {
  let mut filter = OutputFilter::new();
  let mut lines = BufReader::new(reader).lines();
  let mut captured = String::new();
  while let Some(line) = lines.next_line().await? {
    if echo && filter.display(&line) {
      println!("  {line}");
    }
    captured.push_str(&line);
    captured.push('\n');
  }
  Ok(captured)
}

async fn read_stderr(reader: impl AsyncRead + Unpin, echo: bool) -> std::io::Result<String> {
  let mut lines = BufReader::new(reader).lines();
  let mut captured = String::new();
  while let Some(line) = lines.next_line().await? {
    if echo && !line.trim().is_empty() {
      eprintln!("  {line}");
    }
    captured.push_str(&line);
    captured.push('\n');
  }
  Ok(captured)
}
