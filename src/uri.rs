//! Tracked URI keys.
//!
//! The registry does not canonicalize URIs. Equality and hashing are exact
//! string equality on whatever the caller (and its store) consider the URI.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identity key for tracking and lookup.
///
/// Cloning is cheap; the text is shared.
///
/// # Examples
///
/// ```
/// use visited_links::LinkUri;
///
/// let uri = LinkUri::parse(" https://example.org/ ").unwrap();
/// assert_eq!(uri.as_str(), "https://example.org/");
/// assert!(LinkUri::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LinkUri(Arc<str>);

impl LinkUri {
    /// Parses a URI key, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyUri` if nothing remains after trimming.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUri);
        }
        Ok(Self(Arc::from(trimmed)))
    }

    /// Returns the URI text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LinkUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LinkUri {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for LinkUri {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<LinkUri> for String {
    fn from(uri: LinkUri) -> Self {
        uri.0.to_string()
    }
}
