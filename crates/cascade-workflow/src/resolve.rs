//! Document resolution: raw `WorkflowDoc` → locked `Workflow`.
//!
//! Resolution interpolates `${...}` storage references into every command and
//! remote field, and materializes `for` iteration lists into concrete values.
//! Loop-variable references (`${item}`, `${item.field}`) are unknown to
//! storage and pass through verbatim; they are bound later by template
//! instantiation.

use cascade_config::{BlockDef, LoopDef, ParallelDef, RemoteDef, StorageStore, WorkflowDoc};
use serde_json::Value;

use crate::block::{Block, CommandBlock, LoopBlock, LoopValue, RemoteBlock, Workflow};
use crate::error::WorkflowError;

/// Resolve a workflow document against the storage configuration.
pub fn resolve(doc: &WorkflowDoc, storage: &StorageStore) -> Result<Workflow, WorkflowError> {
  let blocks = doc
    .blocks
    .iter()
    .map(|def| resolve_block(def, storage))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(Workflow {
    name: doc.name.clone(),
    blocks,
  })
}

fn resolve_block(def: &BlockDef, storage: &StorageStore) -> Result<Block, WorkflowError> {
  if let Some(run) = &def.run {
    return Ok(Block::Command(CommandBlock {
      name: def.name.clone(),
      description: def.description.clone(),
      command: storage.interpolate(run),
    }));
  }

  if let Some(remote) = &def.run_remotely {
    return Ok(Block::Remote(resolve_remote(
      def.name.as_deref(),
      def.description.as_deref(),
      remote,
      storage,
    )));
  }

  if let Some(parallel) = &def.parallel {
    let children = match parallel {
      ParallelDef::Blocks(defs) => defs
        .iter()
        .map(|d| resolve_block(d, storage))
        .collect::<Result<Vec<_>, _>>()?,
      ParallelDef::Loop(inner) => {
        vec![Block::Loop(resolve_loop(&inner.for_loop, storage)?)]
      }
    };
    return Ok(Block::Parallel(children));
  }

  if let Some(loop_def) = &def.for_loop {
    return Ok(Block::Loop(resolve_loop(loop_def, storage)?));
  }

  Err(WorkflowError::UnrecognizedBlock {
    name: def.name.clone().unwrap_or_else(|| "<unnamed>".to_string()),
  })
}

fn resolve_remote(
  name: Option<&str>,
  description: Option<&str>,
  remote: &RemoteDef,
  storage: &StorageStore,
) -> RemoteBlock {
  let password = remote
    .pass
    .as_deref()
    .map(|p| storage.interpolate(p))
    .filter(|p| !p.is_empty());

  RemoteBlock {
    name: name.map(str::to_string),
    description: description.map(str::to_string),
    host: storage.interpolate(&remote.ip),
    user: storage.interpolate(&remote.user),
    password,
    command: storage.interpolate(&remote.run),
    log_file: remote.log_into.as_deref().map(|l| storage.interpolate(l)),
  }
}

fn resolve_loop(def: &LoopDef, storage: &StorageStore) -> Result<LoopBlock, WorkflowError> {
  if def.individual.is_empty() {
    return Err(WorkflowError::MissingLoopField {
      field: "individual".to_string(),
    });
  }
  if def.list.is_empty() {
    return Err(WorkflowError::MissingLoopField {
      field: "in".to_string(),
    });
  }

  let path = strip_reference(&def.list);
  let items = storage
    .get(path)
    .ok_or_else(|| WorkflowError::LoopListNotFound {
      path: path.to_string(),
    })?;
  let items = items
    .as_array()
    .ok_or_else(|| WorkflowError::LoopListNotAList {
      path: path.to_string(),
    })?;

  let values = items
    .iter()
    .enumerate()
    .map(|(index, item)| loop_value(item, path, index))
    .collect::<Result<Vec<_>, _>>()?;

  let body = resolve_loop_body(def, storage)?;

  Ok(LoopBlock {
    variable: def.individual.clone(),
    values,
    body,
  })
}

fn resolve_loop_body(def: &LoopDef, storage: &StorageStore) -> Result<Vec<Block>, WorkflowError> {
  if let Some(defs) = &def.blocks {
    return defs
      .iter()
      .map(|d| resolve_block(d, storage))
      .collect::<Result<Vec<_>, _>>();
  }

  if let Some(run) = &def.run {
    return Ok(vec![Block::Command(CommandBlock {
      name: def.name.clone(),
      description: def.description.clone(),
      command: storage.interpolate(run),
    })]);
  }

  if let Some(remote) = &def.run_remotely {
    return Ok(vec![Block::Remote(resolve_remote(
      def.name.as_deref(),
      def.description.as_deref(),
      remote,
      storage,
    ))]);
  }

  Err(WorkflowError::UnrecognizedBlock {
    name: format!("for {}", def.individual),
  })
}

/// Accept both `${deploy.hosts}` and a bare `deploy.hosts` as list references.
fn strip_reference(list: &str) -> &str {
  list
    .strip_prefix("${")
    .and_then(|s| s.strip_suffix('}'))
    .unwrap_or(list)
}

fn loop_value(item: &Value, path: &str, index: usize) -> Result<LoopValue, WorkflowError> {
  match item {
    Value::String(s) => Ok(LoopValue::Scalar(s.clone())),
    Value::Number(n) => Ok(LoopValue::Scalar(n.to_string())),
    Value::Bool(b) => Ok(LoopValue::Scalar(b.to_string())),
    Value::Object(map) => {
      let mut fields = std::collections::BTreeMap::new();
      for (key, value) in map {
        let rendered = match value {
          Value::String(s) => s.clone(),
          Value::Number(n) => n.to_string(),
          Value::Bool(b) => b.to_string(),
          _ => {
            return Err(WorkflowError::InvalidLoopItem {
              path: path.to_string(),
              index,
            });
          }
        };
        fields.insert(key.clone(), rendered);
      }
      Ok(LoopValue::Record(fields))
    }
    _ => Err(WorkflowError::InvalidLoopItem {
      path: path.to_string(),
      index,
    }),
  }
}
