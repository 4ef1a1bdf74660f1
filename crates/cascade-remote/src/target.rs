use std::fmt;

use crate::error::RemoteError;

/// A parsed remote target: `user@host`, `ssh://user@host:port`, or a bare
/// host (current user, port 22).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
  pub user: String,
  pub host: String,
  pub port: u16,
}

impl RemoteTarget {
  pub fn parse(target: &str) -> Result<Self, RemoteError> {
    let trimmed = target.strip_prefix("ssh://").unwrap_or(target);

    let (user, host_part) = match trimmed.split_once('@') {
      Some((user, host)) => (user.to_string(), host),
      None => (default_user(), trimmed),
    };

    let (host, port) = match host_part.split_once(':') {
      Some((host, port)) => {
        let port = port.parse::<u16>().map_err(|_| RemoteError::InvalidTarget {
          target: target.to_string(),
          message: format!("invalid port '{port}'"),
        })?;
        (host.to_string(), port)
      }
      None => (host_part.to_string(), 22),
    };

    if host.is_empty() {
      return Err(RemoteError::InvalidTarget {
        target: target.to_string(),
        message: "empty host".to_string(),
      });
    }
    if user.is_empty() {
      return Err(RemoteError::InvalidTarget {
        target: target.to_string(),
        message: "empty user".to_string(),
      });
    }

    Ok(Self { user, host, port })
  }

  /// The `user@host` form the transport client expects.
  pub fn user_at_host(&self) -> String {
    format!("{}@{}", self.user, self.host)
  }
}

impl fmt::Display for RemoteTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.port == 22 {
      write!(f, "{}@{}", self.user, self.host)
    } else {
      write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
  }
}

fn default_user() -> String {
  std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}
