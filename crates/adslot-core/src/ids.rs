//! Newtype identifier for ads.
//!
//! An ad id is the id of the campaign row it was built from, so the same
//! value keys session impression counts and the remote counter RPCs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a sponsored creative (campaign id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdId(String);

impl AdId {
    /// Create a new ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AdId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AdId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for AdId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_str() {
        let id: AdId = "camp-456".into();
        assert_eq!(id.as_str(), "camp-456");
    }

    #[test]
    fn test_id_display() {
        let id = AdId::new("camp-789");
        assert_eq!(format!("{}", id), "camp-789");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = AdId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);

        let back: AdId = serde_json::from_str(r#""abc""#).unwrap();
        assert_eq!(back, id);
    }
}
