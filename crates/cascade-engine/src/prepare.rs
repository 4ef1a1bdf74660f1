//! Command preparation.
//!
//! Every command runs in a fresh interpreter, so the prepared form has to
//! recreate the session around it: change into the session's directory first,
//! then run the user's command, then (on success only) emit the state-capture
//! footer. The footer saves `$?` before anything else and re-exits with it,
//! so instrumentation never masks the user command's exit code.
//!
//! Preparation also pre-computes a *target directory hint* for commands that
//! begin with `cd`. The hint is the fallback when marker parsing yields
//! nothing; it folds leading `cd` clauses chained by `&&` or `;` and stops at
//! `||` / `|`, where guessing the taken path would be wrong as often as
//! right. This is a heuristic by design, not a shell parser.

use std::path::{Component, Path, PathBuf};

use crate::capture::{CWD_BEGIN, CWD_END, ENV_BEGIN, ENV_END};

/// A command ready for process spawn, plus the fallback directory hint.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCommand {
  /// The raw command as authored, for reporting.
  pub raw: String,
  /// The full script handed to the interpreter.
  pub script: String,
  /// Pre-calculated `cd` target, `None` for non-`cd` commands.
  pub target_hint: Option<PathBuf>,
}

/// Prepare a raw command to run against the given session directory.
pub fn prepare(raw: &str, cwd: &Path) -> PreparedCommand {
  let target_hint = precalculate_target(raw, cwd);

  let script = format!(
    "cd {} && {}\n\
     __cascade_rc=$?\n\
     if [ $__cascade_rc -eq 0 ]; then\n\
       echo {CWD_BEGIN}; pwd; echo {CWD_END}\n\
       echo {ENV_BEGIN}; export -p; echo {ENV_END}\n\
     fi\n\
     exit $__cascade_rc",
    shell_quote(&cwd.to_string_lossy()),
    raw.trim_end(),
  );

  PreparedCommand {
    raw: raw.to_string(),
    script,
    target_hint,
  }
}

/// Fold leading `cd` clauses into the directory they land in.
pub fn precalculate_target(raw: &str, cwd: &Path) -> Option<PathBuf> {
  let mut dir = cwd.to_path_buf();
  let mut found = false;
  let mut rest = raw.trim();

  loop {
    let Some(after_cd) = rest.strip_prefix("cd ") else {
      break;
    };
    let (arg_part, operator, remainder) = split_at_operator(after_cd);
    let arg = strip_quotes(arg_part.trim());
    if arg.is_empty() {
      break;
    }

    let candidate = if Path::new(arg).is_absolute() {
      PathBuf::from(arg)
    } else {
      dir.join(arg)
    };
    dir = normalize(&candidate);
    found = true;

    match operator {
      Some("&&") | Some(";") => rest = remainder.trim_start(),
      _ => break,
    }
  }

  found.then_some(dir)
}

/// Split at the first shell chain operator: `&&`, `||`, `;`, `|`, or a
/// newline (treated like `;`).
fn split_at_operator(s: &str) -> (&str, Option<&'static str>, &str) {
  let bytes = s.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'&' if bytes.get(i + 1) == Some(&b'&') => return (&s[..i], Some("&&"), &s[i + 2..]),
      b'|' if bytes.get(i + 1) == Some(&b'|') => return (&s[..i], Some("||"), &s[i + 2..]),
      b'|' => return (&s[..i], Some("|"), &s[i + 1..]),
      b';' | b'\n' => return (&s[..i], Some(";"), &s[i + 1..]),
      _ => i += 1,
    }
  }
  (s, None, "")
}

fn strip_quotes(arg: &str) -> &str {
  for quote in ['\'', '"'] {
    if let Some(inner) = arg
      .strip_prefix(quote)
      .and_then(|s| s.strip_suffix(quote))
    {
      return inner;
    }
  }
  arg
}

/// Lexically normalize `.` and `..` segments without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        out.pop();
      }
      other => out.push(other),
    }
  }
  out
}

fn shell_quote(s: &str) -> String {
  format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn target(raw: &str, cwd: &str) -> Option<PathBuf> {
    precalculate_target(raw, Path::new(cwd))
  }

  #[test]
  fn script_wraps_command_and_preserves_exit_code() {
    let prepared = prepare("echo hi", Path::new("/base"));
    assert!(prepared.script.starts_with("cd '/base' && echo hi\n"));
    assert!(prepared.script.contains(CWD_BEGIN));
    assert!(prepared.script.contains("export -p"));
    assert!(prepared.script.ends_with("exit $__cascade_rc"));
  }

  #[test]
  fn script_quotes_directories_with_spaces() {
    let prepared = prepare("ls", Path::new("/my dir/sub"));
    assert!(prepared.script.starts_with("cd '/my dir/sub' && ls"));
  }

  #[test]
  fn non_cd_command_has_no_hint() {
    assert_eq!(target("echo hi", "/x"), None);
    assert_eq!(target("cd", "/x"), None);
    // Only a *leading* cd is recognized.
    assert_eq!(target("echo hi && cd a", "/x"), None);
  }

  #[test]
  fn simple_relative_and_absolute_cd() {
    assert_eq!(target("cd sub", "/x"), Some(PathBuf::from("/x/sub")));
    assert_eq!(target("cd /abs/path", "/x"), Some(PathBuf::from("/abs/path")));
  }

  #[test]
  fn dot_segments_normalize() {
    assert_eq!(target("cd ..", "/x/y"), Some(PathBuf::from("/x")));
    assert_eq!(target("cd .", "/x"), Some(PathBuf::from("/x")));
    assert_eq!(target("cd ./a/../b", "/x"), Some(PathBuf::from("/x/b")));
  }

  #[test]
  fn chained_cds_fold() {
    assert_eq!(target("cd a && cd ../b", "/x"), Some(PathBuf::from("/x/b")));
    assert_eq!(target("cd a; cd b", "/x"), Some(PathBuf::from("/x/a/b")));
  }

  #[test]
  fn cd_followed_by_other_command_keeps_first_target() {
    assert_eq!(target("cd a && make", "/x"), Some(PathBuf::from("/x/a")));
  }

  #[test]
  fn or_and_pipe_stop_the_fold() {
    assert_eq!(target("cd a || cd b", "/x"), Some(PathBuf::from("/x/a")));
    assert_eq!(target("cd a | tee log", "/x"), Some(PathBuf::from("/x/a")));
  }

  #[test]
  fn quoted_argument_is_unwrapped() {
    assert_eq!(target("cd 'my dir'", "/x"), Some(PathBuf::from("/x/my dir")));
    assert_eq!(target("cd \"my dir\"", "/x"), Some(PathBuf::from("/x/my dir")));
  }

  #[test]
  fn parent_of_root_stays_root() {
    assert_eq!(target("cd ../..", "/x"), Some(PathBuf::from("/")));
  }
}
