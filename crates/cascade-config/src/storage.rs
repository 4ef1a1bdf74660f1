//! Storage configuration store.
//!
//! Every `*.yaml`/`*.yml` file in the storage directory contributes one
//! top-level namespace keyed by its file stem. Values are addressed by
//! dot-path (`machines.web.ip`) and referenced from documents as
//! `${machines.web.ip}`.
//!
//! Storage files may reference each other with the same syntax; those
//! references are resolved with a bounded multi-pass sweep at load time.
//! References that never resolve (unknown paths, circular chains) are left
//! verbatim and warned about, so a stray `${...}` in command output is
//! always traceable back to its document.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ConfigError;

static VAR_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid interpolation pattern"));

/// Maximum passes of intra-storage interpolation before giving up on
/// still-changing references (circular chains oscillate forever).
const MAX_INTERPOLATION_PASSES: usize = 10;

/// Loaded storage configuration, addressable by dot-path.
#[derive(Debug, Clone)]
pub struct StorageStore {
  root: Value,
}

impl StorageStore {
  /// An empty store. Lookups miss and interpolation is the identity.
  pub fn empty() -> Self {
    Self {
      root: Value::Object(serde_json::Map::new()),
    }
  }

  /// Load all YAML files from the storage directory.
  ///
  /// A missing directory is not an error: workflows without configuration
  /// references run against an empty store.
  pub fn load(dir: &Path) -> Result<Self, ConfigError> {
    if !dir.is_dir() {
      warn!(dir = %dir.display(), "storage directory not found, using empty configuration");
      return Ok(Self::empty());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::Io {
      path: dir.to_path_buf(),
      source,
    })?;

    let mut root = serde_json::Map::new();
    for entry in entries {
      let entry = entry.map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
      })?;
      let path = entry.path();

      let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yaml" || e == "yml");
      if !path.is_file() || !is_yaml {
        continue;
      }

      let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };

      let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
      })?;
      let doc: Value = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        message: e.to_string(),
      })?;

      debug!(file = %path.display(), namespace = stem, "loaded storage document");
      root.insert(stem.to_string(), doc);
    }

    let mut store = Self {
      root: Value::Object(root),
    };
    store.interpolate_tree();
    Ok(store)
  }

  /// Look up a value by dot-path.
  pub fn get(&self, path: &str) -> Option<&Value> {
    let mut value = &self.root;
    for part in path.split('.') {
      value = value.as_object()?.get(part)?;
    }
    Some(value)
  }

  /// Replace every `${path.to.value}` in `text` with its storage value.
  /// Unknown paths are left verbatim (loop variables are bound later, by
  /// template instantiation, not here).
  pub fn interpolate(&self, text: &str) -> String {
    VAR_PATTERN
      .replace_all(text, |caps: &regex::Captures| {
        let path = &caps[1];
        match self.get(path) {
          Some(value) => value_to_string(value),
          None => {
            debug!(path, "interpolation reference not found in storage, leaving verbatim");
            caps[0].to_string()
          }
        }
      })
      .into_owned()
  }

  /// Resolve references between storage documents in place.
  fn interpolate_tree(&mut self) {
    for _ in 0..MAX_INTERPOLATION_PASSES {
      let next = interpolate_value(&self.root, self);
      if next == self.root {
        return;
      }
      self.root = next;
    }
    warn!("storage interpolation did not settle, circular reference suspected");
  }
}

/// Render a storage value for substitution into a command string.
fn value_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn interpolate_value(value: &Value, store: &StorageStore) -> Value {
  match value {
    Value::String(s) => Value::String(store.interpolate(s)),
    Value::Array(items) => Value::Array(items.iter().map(|v| interpolate_value(v, store)).collect()),
    Value::Object(map) => Value::Object(
      map
        .iter()
        .map(|(k, v)| (k.clone(), interpolate_value(v, store)))
        .collect(),
    ),
    other => other.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_storage(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
  }

  #[test]
  fn missing_directory_yields_empty_store() {
    let tmp = tempfile::tempdir().unwrap();
    let store = StorageStore::load(&tmp.path().join("nope")).unwrap();
    assert!(store.get("anything").is_none());
  }

  #[test]
  fn dot_path_lookup() {
    let tmp = tempfile::tempdir().unwrap();
    write_storage(
      tmp.path(),
      "machines.yaml",
      "web:\n  ip: 10.0.0.7\n  user: deploy\n",
    );

    let store = StorageStore::load(tmp.path()).unwrap();
    assert_eq!(
      store.get("machines.web.ip").and_then(|v| v.as_str()),
      Some("10.0.0.7")
    );
    assert!(store.get("machines.web.missing").is_none());
    assert!(store.get("other.web").is_none());
  }

  #[test]
  fn interpolates_known_paths() {
    let tmp = tempfile::tempdir().unwrap();
    write_storage(tmp.path(), "machines.yaml", "web:\n  ip: 10.0.0.7\n  port: 8080\n");

    let store = StorageStore::load(tmp.path()).unwrap();
    assert_eq!(
      store.interpolate("curl http://${machines.web.ip}:${machines.web.port}/"),
      "curl http://10.0.0.7:8080/"
    );
  }

  #[test]
  fn unknown_paths_left_verbatim() {
    let store = StorageStore::empty();
    assert_eq!(store.interpolate("echo ${host}"), "echo ${host}");
  }

  #[test]
  fn storage_files_reference_each_other() {
    let tmp = tempfile::tempdir().unwrap();
    write_storage(tmp.path(), "base.yaml", "root: /srv/app\n");
    write_storage(
      tmp.path(),
      "deploy.yaml",
      "target: ${base.root}/releases\nscript: deploy.sh ${deploy.target}\n",
    );

    let store = StorageStore::load(tmp.path()).unwrap();
    assert_eq!(
      store.get("deploy.target").and_then(|v| v.as_str()),
      Some("/srv/app/releases")
    );
    assert_eq!(
      store.get("deploy.script").and_then(|v| v.as_str()),
      Some("deploy.sh /srv/app/releases")
    );
  }

  #[test]
  fn circular_references_settle_unresolved() {
    let tmp = tempfile::tempdir().unwrap();
    write_storage(tmp.path(), "a.yaml", "value: ${b.value}\n");
    write_storage(tmp.path(), "b.yaml", "value: ${a.value}\n");

    let store = StorageStore::load(tmp.path()).unwrap();
    let value = store.get("a.value").and_then(|v| v.as_str()).unwrap();
    assert!(value.contains("${"), "circular reference must stay unresolved, got {value}");
  }

  #[test]
  fn lists_are_addressable() {
    let tmp = tempfile::tempdir().unwrap();
    write_storage(tmp.path(), "deploy.yaml", "hosts:\n  - alpha\n  - beta\n");

    let store = StorageStore::load(tmp.path()).unwrap();
    let hosts = store.get("deploy.hosts").and_then(|v| v.as_array()).unwrap();
    assert_eq!(hosts.len(), 2);
  }
}
