//! Loop expansion by template instantiation.
//!
//! A loop is expanded into one bound copy of its body per iteration value
//! *before* scheduling, so the scheduler never performs variable lookups.
//! Scalar values bind `${var}`; record values bind `${var.field}` per field.

use crate::block::{Block, CommandBlock, LoopBlock, LoopValue, RemoteBlock};

/// Instantiate a loop into its per-iteration blocks, in list order.
///
/// A single-block body yields that block per iteration; a multi-block body
/// yields one sequence per iteration so each iteration stays atomic when the
/// instances are scheduled as parallel siblings.
pub fn instantiate(block: &LoopBlock) -> Vec<Block> {
  block
    .values
    .iter()
    .map(|value| {
      let mut bound: Vec<Block> = block
        .body
        .iter()
        .map(|b| bind_block(b, &block.variable, value))
        .collect();
      if bound.len() == 1 {
        bound.remove(0)
      } else {
        Block::Sequence(bound)
      }
    })
    .collect()
}

fn bind_block(block: &Block, variable: &str, value: &LoopValue) -> Block {
  match block {
    Block::Command(cmd) => Block::Command(CommandBlock {
      name: cmd.name.as_deref().map(|s| bind_str(s, variable, value)),
      description: cmd.description.clone(),
      command: bind_str(&cmd.command, variable, value),
    }),
    Block::Remote(remote) => Block::Remote(RemoteBlock {
      name: remote.name.as_deref().map(|s| bind_str(s, variable, value)),
      description: remote.description.clone(),
      host: bind_str(&remote.host, variable, value),
      user: bind_str(&remote.user, variable, value),
      password: remote
        .password
        .as_deref()
        .map(|s| bind_str(s, variable, value)),
      command: bind_str(&remote.command, variable, value),
      log_file: remote
        .log_file
        .as_deref()
        .map(|s| bind_str(s, variable, value)),
    }),
    Block::Sequence(children) => Block::Sequence(
      children
        .iter()
        .map(|b| bind_block(b, variable, value))
        .collect(),
    ),
    Block::Parallel(children) => Block::Parallel(
      children
        .iter()
        .map(|b| bind_block(b, variable, value))
        .collect(),
    ),
    Block::Loop(inner) => Block::Loop(LoopBlock {
      variable: inner.variable.clone(),
      values: inner.values.clone(),
      body: inner
        .body
        .iter()
        .map(|b| bind_block(b, variable, value))
        .collect(),
    }),
  }
}

fn bind_str(text: &str, variable: &str, value: &LoopValue) -> String {
  match value {
    LoopValue::Scalar(scalar) => text.replace(&format!("${{{variable}}}"), scalar),
    LoopValue::Record(fields) => {
      let mut out = text.to_string();
      for (field, field_value) in fields {
        out = out.replace(&format!("${{{variable}.{field}}}"), field_value);
      }
      out
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  fn command(text: &str) -> Block {
    Block::Command(CommandBlock {
      name: None,
      description: None,
      command: text.to_string(),
    })
  }

  fn command_text(block: &Block) -> &str {
    match block {
      Block::Command(cmd) => &cmd.command,
      other => panic!("expected command, got {other:?}"),
    }
  }

  #[test]
  fn scalar_values_expand_in_list_order() {
    let l = LoopBlock {
      variable: "host".to_string(),
      values: vec![
        LoopValue::Scalar("alpha".to_string()),
        LoopValue::Scalar("beta".to_string()),
        LoopValue::Scalar("gamma".to_string()),
      ],
      body: vec![command("ping ${host}")],
    };

    let blocks = instantiate(&l);
    assert_eq!(blocks.len(), 3);
    assert_eq!(command_text(&blocks[0]), "ping alpha");
    assert_eq!(command_text(&blocks[1]), "ping beta");
    assert_eq!(command_text(&blocks[2]), "ping gamma");
  }

  #[test]
  fn record_values_bind_per_field() {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), "api".to_string());
    fields.insert("port".to_string(), "8080".to_string());

    let l = LoopBlock {
      variable: "svc".to_string(),
      values: vec![LoopValue::Record(fields)],
      body: vec![command("start ${svc.name} --port ${svc.port}")],
    };

    let blocks = instantiate(&l);
    assert_eq!(command_text(&blocks[0]), "start api --port 8080");
  }

  #[test]
  fn multi_block_body_wraps_each_iteration_in_a_sequence() {
    let l = LoopBlock {
      variable: "svc".to_string(),
      values: vec![
        LoopValue::Scalar("api".to_string()),
        LoopValue::Scalar("web".to_string()),
      ],
      body: vec![command("build ${svc}"), command("push ${svc}")],
    };

    let blocks = instantiate(&l);
    assert_eq!(blocks.len(), 2);
    match &blocks[0] {
      Block::Sequence(children) => {
        assert_eq!(command_text(&children[0]), "build api");
        assert_eq!(command_text(&children[1]), "push api");
      }
      other => panic!("expected sequence, got {other:?}"),
    }
  }

  #[test]
  fn remote_fields_are_bound() {
    let mut fields = BTreeMap::new();
    fields.insert("ip".to_string(), "10.0.0.9".to_string());
    fields.insert("user".to_string(), "ops".to_string());

    let l = LoopBlock {
      variable: "m".to_string(),
      values: vec![LoopValue::Record(fields)],
      body: vec![Block::Remote(RemoteBlock {
        name: Some("restart ${m.ip}".to_string()),
        description: None,
        host: "${m.ip}".to_string(),
        user: "${m.user}".to_string(),
        password: None,
        command: "sudo systemctl restart app".to_string(),
        log_file: Some("logs/${m.ip}.log".to_string()),
      })],
    };

    let blocks = instantiate(&l);
    match &blocks[0] {
      Block::Remote(remote) => {
        assert_eq!(remote.host, "10.0.0.9");
        assert_eq!(remote.user, "ops");
        assert_eq!(remote.name.as_deref(), Some("restart 10.0.0.9"));
        assert_eq!(remote.log_file.as_deref(), Some("logs/10.0.0.9.log"));
      }
      other => panic!("expected remote, got {other:?}"),
    }
  }

  #[test]
  fn unrelated_placeholders_pass_through() {
    let l = LoopBlock {
      variable: "a".to_string(),
      values: vec![LoopValue::Scalar("1".to_string())],
      body: vec![command("echo ${a} ${b}")],
    };

    let blocks = instantiate(&l);
    assert_eq!(command_text(&blocks[0]), "echo 1 ${b}");
  }
}
