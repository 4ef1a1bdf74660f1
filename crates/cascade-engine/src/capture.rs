//! The marker protocol: recovering session state from process output.
//!
//! The prepared command's footer prints two sentinel-delimited sections after
//! the user command succeeds — the actual final working directory and the
//! full `export -p` listing. The executor shows the user everything *except*
//! those sections, keeps the raw buffer, and parses the sections out of it
//! once the process exits.
//!
//! Fallback order when parsing yields nothing: the pre-calculated directory
//! hint, then leaving state unchanged. Absent or malformed sections are never
//! fatal.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::session::{EnvChange, SessionUpdate};

pub const CWD_BEGIN: &str = "__STATE_CWD_BEGIN__";
pub const CWD_END: &str = "__STATE_CWD_END__";
pub const ENV_BEGIN: &str = "__STATE_ENV_BEGIN__";
pub const ENV_END: &str = "__STATE_ENV_END__";

/// `declare -x NAME="value"` / `export NAME=value`, with double-quoted,
/// single-quoted, or bare values. `declare -x NAME` (no assignment) is
/// intentionally not matched.
static EXPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"^(?:declare -x |export )([A-Za-z_][A-Za-z0-9_]*)=(?:"([^"]*)"|'([^']*)'|(\S+))"#)
    .expect("valid export pattern")
});

/// Suppresses marker sections from the live display stream.
///
/// Feed every line through [`OutputFilter::display`]; it returns whether the
/// line belongs on the user's console. The captured buffer keeps all lines
/// regardless.
#[derive(Debug, Default)]
pub struct OutputFilter {
  in_section: bool,
}

impl OutputFilter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn display(&mut self, line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed == CWD_BEGIN || trimmed == ENV_BEGIN {
      self.in_section = true;
      return false;
    }
    if trimmed == CWD_END || trimmed == ENV_END {
      self.in_section = false;
      return false;
    }
    !self.in_section
  }
}

/// Output split into the user-visible part and the state sections.
#[derive(Debug, Default, PartialEq)]
pub struct CapturedSections {
  /// Output with the marker sections removed.
  pub clean: String,
  pub cwd_section: Option<String>,
  pub env_section: Option<String>,
}

/// Split a captured stdout buffer into clean output and marker sections.
pub fn split_sections(stdout: &str) -> CapturedSections {
  let mut clean = String::new();
  let mut cwd_section: Option<String> = None;
  let mut env_section: Option<String> = None;

  enum Zone {
    Clean,
    Cwd,
    Env,
  }
  let mut zone = Zone::Clean;

  for line in stdout.lines() {
    match line.trim() {
      CWD_BEGIN => {
        cwd_section.get_or_insert_with(String::new);
        zone = Zone::Cwd;
        continue;
      }
      ENV_BEGIN => {
        env_section.get_or_insert_with(String::new);
        zone = Zone::Env;
        continue;
      }
      CWD_END | ENV_END => {
        zone = Zone::Clean;
        continue;
      }
      _ => {}
    }

    let target = match zone {
      Zone::Clean => &mut clean,
      Zone::Cwd => cwd_section.as_mut().expect("cwd section opened"),
      Zone::Env => env_section.as_mut().expect("env section opened"),
    };
    target.push_str(line);
    target.push('\n');
  }

  CapturedSections {
    clean,
    cwd_section,
    env_section,
  }
}

/// Build the session update implied by a captured buffer.
///
/// The CWD section is authoritative when present and non-empty; otherwise the
/// pre-calculated hint is used; otherwise the directory is left unchanged.
pub fn state_update(sections: &CapturedSections, target_hint: Option<&PathBuf>) -> SessionUpdate {
  let cwd = sections
    .cwd_section
    .as_deref()
    .and_then(parse_cwd)
    .or_else(|| target_hint.cloned());

  let env = sections
    .env_section
    .as_deref()
    .map(parse_exports)
    .unwrap_or_default();

  SessionUpdate { cwd, env }
}

fn parse_cwd(section: &str) -> Option<PathBuf> {
  section
    .lines()
    .map(str::trim)
    .find(|line| !line.is_empty())
    .map(PathBuf::from)
}

/// Parse an `export -p` listing into environment changes.
pub fn parse_exports(section: &str) -> Vec<EnvChange> {
  section
    .lines()
    .filter_map(|line| {
      let caps = EXPORT_PATTERN.captures(line)?;
      let name = caps[1].to_string();
      let value = caps
        .get(2)
        .or_else(|| caps.get(3))
        .or_else(|| caps.get(4))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
      Some(EnvChange::Set { name, value })
    })
    .collect()
}
