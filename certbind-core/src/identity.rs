//! Composite identifiers - two logical keys joined by `/`

use std::fmt;
use std::str::FromStr;

/// Delimiter between the parent and child parts
pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Malformed identifier '{id}': expected <parent>/<child>, got {parts} part(s)")]
    WrongPartCount { id: String, parts: usize },

    #[error("Malformed identifier '{id}': empty {which} part")]
    EmptyPart { id: String, which: &'static str },
}

/// Parent/child key pair, serialized as `"<parent>/<child>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    pub parent: String,
    pub child: String,
}

impl CompositeId {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }

    pub fn parse(id: &str) -> Result<Self, IdentityError> {
        let parts: Vec<&str> = id.split(SEPARATOR).collect();
        if parts.len() != 2 {
            return Err(IdentityError::WrongPartCount {
                id: id.to_string(),
                parts: parts.len(),
            });
        }
        if parts[0].is_empty() {
            return Err(IdentityError::EmptyPart {
                id: id.to_string(),
                which: "parent",
            });
        }
        if parts[1].is_empty() {
            return Err(IdentityError::EmptyPart {
                id: id.to_string(),
                which: "child",
            });
        }
        Ok(Self::new(parts[0], parts[1]))
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.parent, SEPARATOR, self.child)
    }
}

impl FromStr for CompositeId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
