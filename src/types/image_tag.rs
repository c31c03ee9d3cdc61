// ABOUTME: Container image tag validation.
// ABOUTME: Accepts forms like nginx, nginx:1.25, registry:5000/org/app:v1.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageTagError {
    #[error("image tag cannot be empty")]
    Empty,

    #[error("invalid character in image tag: {0:?}")]
    InvalidChar(char),

    #[error("invalid image tag format: {0}")]
    InvalidFormat(String),
}

/// A container image reference as understood by the docker/podman CLI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageTag(String);

impl ImageTag {
    pub fn parse(input: &str) -> Result<Self, ImageTagError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ImageTagError::Empty);
        }

        if let Some(c) = input.chars().find(|c| {
            !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
        }) {
            return Err(ImageTagError::InvalidChar(c));
        }

        if input.starts_with(['/', ':', '@', '-', '.'])
            || input.ends_with(['/', ':', '@'])
            || input.contains("//")
        {
            return Err(ImageTagError::InvalidFormat(input.to_string()));
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_forms() {
        for tag in [
            "nginx",
            "nginx:1.25",
            "ghcr.io/org/app:v1.2.3",
            "localhost:5000/app",
            "app@sha256:abc123",
        ] {
            assert!(ImageTag::parse(tag).is_ok(), "{tag} should parse");
        }
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(ImageTag::parse("  app:v1 ").unwrap().as_str(), "app:v1");
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert_eq!(
            ImageTag::parse("app;rm -rf /"),
            Err(ImageTagError::InvalidChar(';'))
        );
    }

    #[test]
    fn rejects_dangling_separators() {
        assert!(matches!(
            ImageTag::parse("app:"),
            Err(ImageTagError::InvalidFormat(_))
        ));
        assert!(matches!(
            ImageTag::parse("-app"),
            Err(ImageTagError::InvalidFormat(_))
        ));
        assert_eq!(ImageTag::parse(""), Err(ImageTagError::Empty));
    }
}
