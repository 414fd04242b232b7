use std::{fmt, hash};
use uuid::Uuid;

/// Unique identifier of one emitted [`Activity`](crate::Activity).
///
/// Generated from a random UUID v4 when the activity is built. Two
/// activities never share an id, so the id survives as a stable handle
/// into the [`ObservedMessageContexts`](crate::ObservedMessageContexts)
/// after the session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, hash::Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivityId(u128);

impl ActivityId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    pub fn value(&self) -> u128 {
        self.0
    }
}

impl From<u128> for ActivityId {
    fn from(value: u128) -> Self {
        ActivityId(value)
    }
}

impl From<ActivityId> for u128 {
    fn from(value: ActivityId) -> Self {
        value.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_u128(self.0))
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        ActivityId::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(ActivityId::new(), ActivityId::new());
    }

    #[test]
    fn display_renders_uuid() {
        let id = ActivityId::from(0x1234_u128);
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000001234");
    }
}
