//! Wire format shared by clients and the hub
//!
//! One JSON message shape travels in both directions:
//! `{"jury": "<ROLE or FINAL>", "vote": "<string>"}`.

use crate::types::*;
use serde::{Deserialize, Serialize};

/// Errors raised while decoding an inbound frame. Both are terminal for the
/// connection that sent the frame.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unrecognized jury role: {0:?}")]
    InvalidRole(String),
}

/// Inbound frame before role validation
#[derive(Debug, Deserialize)]
struct RawMessage {
    jury: String,
    vote: String,
}

/// Outbound frame: either a relayed vote or a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteMessage {
    pub jury: Jury,
    pub vote: String,
}

impl VoteMessage {
    pub fn relay(ballot: &Ballot) -> Self {
        Self {
            jury: Jury::Role(ballot.role),
            vote: ballot.vote.clone(),
        }
    }

    pub fn decision(decision: &Decision) -> Self {
        Self {
            jury: Jury::Final,
            vote: decision.verdict.clone(),
        }
    }
}

/// Check a `jury` label against the inbound role set. `FINAL` is outbound-only.
pub fn is_valid_role(role: &str) -> bool {
    role.parse::<Role>().is_ok()
}

/// Decode an inbound text frame into a validated ballot
pub fn decode(raw: &str) -> Result<Ballot, CodecError> {
    let msg: RawMessage = serde_json::from_str(raw)?;
    let role = msg
        .jury
        .parse::<Role>()
        .map_err(|UnknownRole(label)| CodecError::InvalidRole(label))?;
    Ok(Ballot {
        role,
        vote: msg.vote,
    })
}

/// Encode an outbound message as a JSON text frame
pub fn encode(msg: &VoteMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
