// ABOUTME: Stage and version name validation.
// ABOUTME: Both end up in file paths, so separators and traversal are rejected.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{what} exceeds maximum length of {max} characters")]
    TooLong { what: &'static str, max: usize },

    #[error("{what} cannot be {value:?}")]
    Reserved { what: &'static str, value: String },

    #[error("invalid character in {what}: {c:?}")]
    InvalidChar { what: &'static str, c: char },
}

/// Name of a deployment stage, e.g. `staging` or `production`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageName(String);

impl StageName {
    pub fn new(value: &str) -> Result<Self, NameError> {
        const WHAT: &str = "stage name";

        if value.is_empty() {
            return Err(NameError::Empty(WHAT));
        }
        if value.len() > 63 {
            return Err(NameError::TooLong { what: WHAT, max: 63 });
        }
        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
                return Err(NameError::InvalidChar { what: WHAT, c });
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version label being deployed, e.g. `1.0.0` or `2024.06-rc1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    pub fn new(value: &str) -> Result<Self, NameError> {
        const WHAT: &str = "version";

        if value.is_empty() {
            return Err(NameError::Empty(WHAT));
        }
        if value.len() > 128 {
            return Err(NameError::TooLong { what: WHAT, max: 128 });
        }
        if value == "." || value == ".." {
            return Err(NameError::Reserved {
                what: WHAT,
                value: value.to_string(),
            });
        }
        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_' | '+') {
                return Err(NameError::InvalidChar { what: WHAT, c });
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
