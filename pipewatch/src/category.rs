use std::fmt;

/// The classification axis of pipeline events.
///
/// Every recognized activity maps to exactly one category, and a wait call
/// matches only events of the category it asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventCategory {
    /// A message was received and is about to be processed.
    Incoming,
    /// A message is being sent or published.
    Outgoing,
    /// A handler processed a message.
    InvokedHandler,
}

impl EventCategory {
    /// Human-readable label, used in log fields and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::Incoming => "Incoming",
            EventCategory::Outgoing => "Outgoing",
            EventCategory::InvokedHandler => "InvokedHandler",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
