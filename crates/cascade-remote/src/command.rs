//! Transport invocation building.
//!
//! The transport is the system `ssh` client, spawned with a constructed
//! argument vector; password authentication wraps it in `sshpass -p`. The
//! remote command travels as a single trailing argument so the remote shell
//! handles pipes, redirects, and chaining.

use crate::target::RemoteTarget;

/// Rewrite `sudo` invocations to read the password from stdin.
///
/// `sudo cmd` becomes `echo '<password>' | sudo -S cmd`, so privileged
/// commands run without passwordless sudo configured on the target. Purely
/// textual; callers decide whether a password is available at all.
pub fn inject_sudo_password(command: &str, password: &str) -> String {
  if !command.contains("sudo ") {
    return command.to_string();
  }
  let quoted = password.replace('\'', r"'\''");
  command.replace("sudo ", &format!("echo '{quoted}' | sudo -S "))
}

/// Build the `(program, args)` pair for one remote invocation.
pub fn build_invocation(
  target: &RemoteTarget,
  password: Option<&str>,
  command: &str,
) -> (String, Vec<String>) {
  let remote_command = match password {
    Some(password) => inject_sudo_password(command, password),
    None => command.to_string(),
  };

  let mut ssh_args = vec![
    "-p".to_string(),
    target.port.to_string(),
    "-o".to_string(),
    "StrictHostKeyChecking=no".to_string(),
    "-o".to_string(),
    "ConnectTimeout=10".to_string(),
    target.user_at_host(),
    remote_command,
  ];

  match password {
    Some(password) => {
      let mut args = vec!["-p".to_string(), password.to_string(), "ssh".to_string()];
      args.append(&mut ssh_args);
      ("sshpass".to_string(), args)
    }
    None => ("ssh".to_string(), ssh_args),
  }
}
