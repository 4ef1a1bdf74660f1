//! Cascade Config
//!
//! This crate contains the serializable workflow document types for cascade
//! and the storage configuration store.
//!
//! A workflow is authored as a YAML document whose blocks use the surface
//! keys `run`, `run-remotely`, `parallel`, and `for`. Alongside the document
//! lives a *storage directory* of YAML configuration files; `${path.to.value}`
//! references in the document are resolved against those files by dot-path.
//!
//! The resolver in `cascade-workflow` turns these raw types into the locked
//! block tree the engine executes.

mod document;
mod error;
mod storage;

pub use document::{
  BlockDef, LoopDef, ParallelDef, ParallelLoopDef, RemoteDef, WorkflowDoc, load_workflow_doc,
};
pub use error::ConfigError;
pub use storage::StorageStore;
