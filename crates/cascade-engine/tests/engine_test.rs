//! End-to-end engine tests against real shell processes.

use std::path::{Path, PathBuf};

use cascade_engine::{Engine, EngineConfig, RunReport};
use cascade_workflow::{Block, CommandBlock, LoopBlock, LoopValue, RemoteBlock, Workflow};

fn command(text: &str) -> Block {
  Block::Command(CommandBlock {
    name: None,
    description: None,
    command: text.to_string(),
  })
}

fn named_command(name: &str, text: &str) -> Block {
  Block::Command(CommandBlock {
    name: Some(name.to_string()),
    description: None,
    command: text.to_string(),
  })
}

fn scalar_loop(variable: &str, values: &[&str], body_command: &str) -> Block {
  Block::Loop(LoopBlock {
    variable: variable.to_string(),
    values: values
      .iter()
      .map(|v| LoopValue::Scalar(v.to_string()))
      .collect(),
    body: vec![command(body_command)],
  })
}

async fn run(dir: &Path, blocks: Vec<Block>) -> RunReport {
  let engine = Engine::new(EngineConfig {
    workflow_dir: dir.to_path_buf(),
    echo_output: false,
  });
  let workflow = Workflow {
    name: Some("test".to_string()),
    blocks,
  };
  engine.execute(&workflow).await.expect("engine run failed")
}

fn base_dir(tmp: &tempfile::TempDir) -> PathBuf {
  tmp.path().canonicalize().unwrap()
}

#[tokio::test]
async fn sequential_directory_changes_accumulate() {
  let tmp = tempfile::tempdir().unwrap();
  let base = base_dir(&tmp);

  let report = run(
    &base,
    vec![
      command("mkdir -p one/two"),
      command("cd one"),
      command("cd two"),
      command("pwd"),
    ],
  )
  .await;

  assert!(report.success);
  assert_eq!(
    report.results[3].output.trim(),
    base.join("one/two").to_string_lossy()
  );
}

#[tokio::test]
async fn end_to_end_mkdir_cd_pwd() {
  let tmp = tempfile::tempdir().unwrap();
  let base = base_dir(&tmp);

  let report = run(
    &base,
    vec![command("mkdir sub"), command("cd sub"), command("pwd")],
  )
  .await;

  assert!(report.success);
  assert_eq!(
    report.results[2].output.trim(),
    base.join("sub").to_string_lossy()
  );
}

#[tokio::test]
async fn exported_environment_flows_forward() {
  let tmp = tempfile::tempdir().unwrap();

  let report = run(
    &base_dir(&tmp),
    vec![
      command(r#"export GREETING="va lue""#),
      command(r#"echo "$GREETING""#),
    ],
  )
  .await;

  assert!(report.success);
  assert_eq!(report.results[1].output.trim(), "va lue");
}

#[tokio::test]
async fn failing_block_aborts_the_sequence() {
  let tmp = tempfile::tempdir().unwrap();

  let report = run(
    &base_dir(&tmp),
    vec![
      command("echo first"),
      named_command("boom", "exit 2"),
      command("echo never"),
    ],
  )
  .await;

  assert!(!report.success);
  assert_eq!(report.total(), 2, "third block must not run");
  assert_eq!(report.results[1].exit_code, Some(2));
  assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn parallel_branches_cannot_leak_state_past_the_join() {
  let tmp = tempfile::tempdir().unwrap();
  let base = base_dir(&tmp);

  let report = run(
    &base,
    vec![
      command("mkdir -p a b"),
      Block::Parallel(vec![
        command("cd a && export FROM_A=1"),
        command("cd b && export FROM_B=1"),
      ]),
      command("pwd"),
      command(r#"echo "${FROM_A:-unset} ${FROM_B:-unset}""#),
    ],
  )
  .await;

  assert!(report.success);
  assert_eq!(report.results[3].output.trim(), base.to_string_lossy());
  assert_eq!(report.results[4].output.trim(), "unset unset");
}

#[tokio::test]
async fn parallel_runs_every_branch_despite_failures() {
  let tmp = tempfile::tempdir().unwrap();

  let report = run(
    &base_dir(&tmp),
    vec![Block::Parallel(vec![
      named_command("fails", "exit 1"),
      named_command("talks", "echo ok"),
    ])],
  )
  .await;

  assert!(!report.success, "a failed branch fails the group");
  assert_eq!(report.total(), 2, "both branches ran to completion");

  let ok = report
    .results
    .iter()
    .find(|r| r.name == "talks")
    .expect("surviving branch result");
  assert!(ok.status.is_success());
  assert_eq!(ok.output.trim(), "ok");
}

#[tokio::test]
async fn loop_in_sequence_runs_in_list_order() {
  let tmp = tempfile::tempdir().unwrap();

  let report = run(
    &base_dir(&tmp),
    vec![scalar_loop("item", &["one", "two", "three"], "echo ${item}")],
  )
  .await;

  assert!(report.success);
  assert_eq!(report.total(), 3);
  let outputs: Vec<&str> = report.results.iter().map(|r| r.output.trim()).collect();
  assert_eq!(outputs, ["one", "two", "three"]);
}

#[tokio::test]
async fn loop_in_parallel_shares_one_fork() {
  let tmp = tempfile::tempdir().unwrap();

  let report = run(
    &base_dir(&tmp),
    vec![Block::Parallel(vec![scalar_loop(
      "item",
      &["a", "b", "c", "d"],
      "echo ${item}",
    )])],
  )
  .await;

  assert!(report.success);
  assert_eq!(report.total(), 4);

  let mut outputs: Vec<&str> = report.results.iter().map(|r| r.output.trim()).collect();
  outputs.sort_unstable();
  assert_eq!(outputs, ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn loop_failure_aborts_remaining_iterations() {
  let tmp = tempfile::tempdir().unwrap();

  let report = run(
    &base_dir(&tmp),
    vec![scalar_loop("n", &["0", "1", "2"], "exit ${n}")],
  )
  .await;

  assert!(!report.success);
  // exit 0 succeeds, exit 1 fails, exit 2 never runs.
  assert_eq!(report.total(), 2);
}

#[tokio::test]
async fn unlogged_parallel_remote_is_rejected_before_running_anything() {
  let tmp = tempfile::tempdir().unwrap();
  let base = base_dir(&tmp);

  let engine = Engine::new(EngineConfig {
    workflow_dir: base.clone(),
    echo_output: false,
  });
  let workflow = Workflow {
    name: None,
    blocks: vec![
      command("touch should-not-exist"),
      Block::Parallel(vec![Block::Remote(RemoteBlock {
        name: None,
        description: None,
        host: "10.0.0.7".to_string(),
        user: "deploy".to_string(),
        password: None,
        command: "uptime".to_string(),
        log_file: None,
      })]),
    ],
  };

  let result = engine.execute(&workflow).await;
  assert!(matches!(
    result,
    Err(cascade_engine::EngineError::Validation(_))
  ));
  assert!(
    !base.join("should-not-exist").exists(),
    "validation must reject before any block runs"
  );
}

#[tokio::test]
async fn nested_sequence_inside_parallel_threads_its_own_state() {
  let tmp = tempfile::tempdir().unwrap();
  let base = base_dir(&tmp);

  let report = run(
    &base,
    vec![
      command("mkdir -p branch"),
      Block::Parallel(vec![Block::Sequence(vec![
        command("cd branch"),
        command("pwd"),
      ])]),
    ],
  )
  .await;

  assert!(report.success);
  let pwd = report
    .results
    .iter()
    .find(|r| r.output.contains("branch"))
    .expect("branch-local pwd result");
  assert_eq!(pwd.output.trim(), base.join("branch").to_string_lossy());
}
