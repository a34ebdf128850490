use std::fmt;

/// Identity of a connected WebSocket subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(uuid::Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> uuid::Uuid {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for SubscriberId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0.simple())
    }
}

/// Device link lifecycle
///
/// `Absent` is terminal when discovery found no device. `Closed` is terminal
/// as well: the link is never reopened for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Absent,
    Opening,
    Open,
    Closed,
}

impl LinkState {
    pub fn is_open(&self) -> bool {
        matches!(self, LinkState::Open)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Absent => write!(f, "Absent"),
            LinkState::Opening => write!(f, "Opening"),
            LinkState::Open => write!(f, "Open"),
            LinkState::Closed => write!(f, "Closed"),
        }
    }
}
