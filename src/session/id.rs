//! Connection-scoped session identifier.

use std::fmt;

/// Identifier of one connected session.
///
/// Ids are handed out by the [`SessionRegistry`](super::SessionRegistry)
/// that tracks the session and are unique within it. Displayed as
/// `conn-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw value.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_display_format() {
        assert_eq!(SessionId::from_raw(7).to_string(), "conn-7");
    }

    #[test]
    fn test_hash_eq() {
        let mut set = HashSet::new();
        set.insert(SessionId::from_raw(42));
        assert!(set.contains(&SessionId::from_raw(42)));
        assert!(!set.contains(&SessionId::from_raw(43)));
    }
}
