use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque ID types for type safety
pub type ConnId = String;
pub type RoundNo = u64;

/// Jury seats that may cast votes. The set is closed: anything else on the
/// wire is rejected before it reaches the tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Left,
    Right,
    Center,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Left, Role::Right, Role::Center];

    /// Number of distinct roles that must vote before a round completes
    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Left => "LEFT",
            Role::Right => "RIGHT",
            Role::Center => "CENTER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label that names no jury seat
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Label carried in the `jury` field of outbound messages.
///
/// `Final` is reserved for decisions and never accepted inbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jury {
    Role(Role),
    Final,
}

impl Jury {
    pub const FINAL_LABEL: &'static str = "FINAL";

    pub fn as_str(&self) -> &'static str {
        match self {
            Jury::Role(role) => role.as_str(),
            Jury::Final => Self::FINAL_LABEL,
        }
    }
}

impl Serialize for Jury {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A validated vote from one jury seat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub role: Role,
    pub vote: String,
}

impl Ballot {
    pub fn new(role: Role, vote: impl Into<String>) -> Self {
        Self {
            role,
            vote: vote.into(),
        }
    }
}

/// Result of a completed round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub round: RoundNo,
    pub verdict: String,
    /// Votes per label, in first-submitted order
    pub counts: Vec<(String, usize)>,
    pub decided_at: String, // ISO timestamp
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer sent a Close frame or the stream ended
    ClosedByPeer,
    /// Inbound payload was not a valid vote message
    Malformed(String),
    /// Inbound payload named a role outside the jury set
    InvalidRole(String),
    /// Read or write on the socket failed or timed out
    Transport(String),
    /// A broadcast could not be delivered to this connection
    DeliveryFailed,
    /// The vote funnel is no longer running
    HubShutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClosedByPeer => f.write_str("closed by peer"),
            DisconnectReason::Malformed(e) => write!(f, "malformed message: {}", e),
            DisconnectReason::InvalidRole(r) => write!(f, "invalid role: {}", r),
            DisconnectReason::Transport(e) => write!(f, "transport error: {}", e),
            DisconnectReason::DeliveryFailed => f.write_str("delivery failed"),
            DisconnectReason::HubShutdown => f.write_str("hub shut down"),
        }
    }
}
