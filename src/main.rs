use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cascade_config::{StorageStore, load_workflow_doc};
use cascade_engine::{Engine, EngineConfig};
use cascade_remote::{OutputSink, RemoteTarget};

mod report;

/// Cascade - a declarative workflow runner for local and remote shell commands
#[derive(Parser)]
#[command(name = "cascade")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow document
  Run {
    /// Path to the workflow file (YAML)
    workflow_file: PathBuf,

    /// Directory of configuration YAML files (resolved relative to the
    /// workflow file when not absolute)
    #[arg(long, default_value = "storage")]
    storage: PathBuf,
  },

  /// Execute one command on a remote host and stream its output to a log file
  Remote {
    /// Remote target (user@host or ssh://user@host:port)
    target: String,

    /// Command to execute on the remote machine
    command: String,

    /// Destination log file path
    log_file: PathBuf,

    /// Password for SSH authentication (key-based auth is used when omitted)
    #[arg(short, long)]
    password: Option<String>,
  },
}

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Run {
      workflow_file,
      storage,
    } => run_workflow(workflow_file, storage),
    Commands::Remote {
      target,
      command,
      log_file,
      password,
    } => run_remote(target, command, log_file, password),
  }
}

fn run_workflow(workflow_file: PathBuf, storage: PathBuf) -> Result<ExitCode> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run_workflow_async(workflow_file, storage))
}

async fn run_workflow_async(workflow_file: PathBuf, storage: PathBuf) -> Result<ExitCode> {
  let workflow_file = workflow_file
    .canonicalize()
    .with_context(|| format!("workflow file not found: {}", workflow_file.display()))?;
  let workflow_dir = workflow_file
    .parent()
    .context("workflow file has no parent directory")?
    .to_path_buf();

  let doc = load_workflow_doc(&workflow_file)
    .with_context(|| format!("failed to load workflow: {}", workflow_file.display()))?;

  let storage_dir = if storage.is_absolute() {
    storage
  } else {
    workflow_dir.join(storage)
  };
  let storage = StorageStore::load(&storage_dir)
    .with_context(|| format!("failed to load storage: {}", storage_dir.display()))?;

  let workflow = cascade_workflow::resolve(&doc, &storage).context("failed to resolve workflow")?;

  let engine = Engine::new(EngineConfig {
    workflow_dir,
    echo_output: true,
  });
  let report = engine
    .execute(&workflow)
    .await
    .context("workflow execution failed")?;

  report::print_summary(&report);

  Ok(if report.success {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}

fn run_remote(
  target: String,
  command: String,
  log_file: PathBuf,
  password: Option<String>,
) -> Result<ExitCode> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let target = RemoteTarget::parse(&target)?;
    let sink = OutputSink::LogFile(log_file.clone());

    eprintln!("Executing on {target}: {command}");
    eprintln!("Streaming log to: {}", log_file.display());

    let outcome = cascade_remote::execute(&target, password.as_deref(), &command, &sink)
      .await
      .context("remote execution failed")?;

    match outcome.exit_code {
      Some(code) => eprintln!("Command completed with exit status: {code}"),
      None => eprintln!("Command terminated without an exit status"),
    }

    Ok(if outcome.success() {
      ExitCode::SUCCESS
    } else {
      ExitCode::FAILURE
    })
  })
}
