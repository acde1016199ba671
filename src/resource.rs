use core::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAX_NAME_LEN: usize = 64;

/// Name of a resource collection, e.g. `products` or `blog`.
///
/// The name becomes part of a file path or a storage key, so only ASCII
/// letters, digits, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(String);

#[derive(Debug, Error, PartialEq)]
pub enum ResourceNameError {
    #[error("resource name is empty")]
    Empty,
    #[error("resource name is longer than {MAX_NAME_LEN} characters")]
    TooLong,
    #[error("resource name contains invalid character {0:?}")]
    InvalidChar(char),
}

impl ResourceName {
    pub fn parse(name: &str) -> Result<Self, ResourceNameError> {
        if name.is_empty() {
            return Err(ResourceNameError::Empty);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ResourceNameError::TooLong);
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ResourceNameError::InvalidChar(c));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ResourceName {
    type Err = ResourceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
