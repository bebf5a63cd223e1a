//! `Username`: a non-empty identifier, unique within a server, compared
//! case-sensitively.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Option<Username> {
        if raw.is_empty() {
            None
        } else {
            Some(Username(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_username_is_invalid() {
        assert!(Username::parse("").is_none());
    }

    #[test]
    fn equality_is_case_sensitive() {
        assert_ne!(Username::parse("Alice"), Username::parse("alice"));
    }
}
