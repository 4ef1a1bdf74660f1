use thiserror::Error;

/// Engine-level failures. Block execution failures (non-zero exits, transport
/// errors) are *not* errors — they are recorded in block results and handled
/// by sequence-abort semantics. An `EngineError` means the run itself could
/// not proceed.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The workflow was rejected before anything spawned.
  #[error("workflow validation failed: {0}")]
  Validation(#[from] cascade_workflow::WorkflowError),

  /// A spawned branch task could not be joined.
  #[error("parallel branch panicked or was aborted: {message}")]
  BranchJoin { message: String },
}
