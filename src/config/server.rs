// ABOUTME: Host identifiers for remote servers.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use serde::Deserialize;
use std::fmt;

/// An opaque address for one remote server.
///
/// No connection state lives here; transports resolve user and port
/// defaults from the `ssh` settings when they connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostHandle {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
}

impl HostHandle {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            user: None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) => {
                if user.is_empty() {
                    return Err(format!("empty user in server address: {s}"));
                }
                (Some(user.to_string()), rest)
            }
            None => (None, s),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {port}"))?;
                (host, Some(port))
            }
            None => (rest, None),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }
        if host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(format!("invalid hostname: {host}"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            user,
        })
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_host() {
        let h = HostHandle::parse("web1.example.com").unwrap();
        assert_eq!(h.host, "web1.example.com");
        assert_eq!(h.port, None);
        assert_eq!(h.user, None);
    }

    #[test]
    fn parse_full_form() {
        let h = HostHandle::parse("deploy@web2:2222").unwrap();
        assert_eq!(h.host, "web2");
        assert_eq!(h.port, Some(2222));
        assert_eq!(h.user.as_deref(), Some("deploy"));
        assert_eq!(h.to_string(), "deploy@web2:2222");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(HostHandle::parse("").is_err());
        assert!(HostHandle::parse("@web").is_err());
        assert!(HostHandle::parse("web:http").is_err());
        assert!(HostHandle::parse(":22").is_err());
        assert!(HostHandle::parse("we b").is_err());
    }
}
