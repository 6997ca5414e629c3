//! Lifecycle hooks for observing the hub without touching transport internals

use crate::types::*;

/// Receives connection and round lifecycle events.
///
/// Every method has a no-op default, so implementors only override what they
/// care about. Hooks are called inline and must not block.
pub trait HubObserver: Send + Sync {
    fn on_connect(&self, _conn_id: &str) {}

    /// Called exactly once per connection, by whichever side closed it first
    fn on_disconnect(&self, _conn_id: &str, _reason: &DisconnectReason) {}

    /// A vote entered the tally. `tallied` is the number of distinct roles
    /// recorded so far in this round.
    fn on_vote_recorded(&self, _round: RoundNo, _ballot: &Ballot, _tallied: usize) {}

    fn on_round_decided(&self, _decision: &Decision) {}
}

/// Default observer: structured log lines via `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl HubObserver for TracingObserver {
    fn on_connect(&self, conn_id: &str) {
        tracing::info!(conn_id, "New client connected");
    }

    fn on_disconnect(&self, conn_id: &str, reason: &DisconnectReason) {
        match reason {
            DisconnectReason::ClosedByPeer => {
                tracing::info!(conn_id, %reason, "Client disconnected")
            }
            _ => tracing::warn!(conn_id, %reason, "Client disconnected"),
        }
    }

    fn on_vote_recorded(&self, round: RoundNo, ballot: &Ballot, tallied: usize) {
        tracing::info!(
            round,
            role = %ballot.role,
            vote = %ballot.vote,
            tallied,
            "Vote recorded"
        );
    }

    fn on_round_decided(&self, decision: &Decision) {
        tracing::info!(
            round = decision.round,
            verdict = %decision.verdict,
            counts = ?decision.counts,
            "Round decided"
        );
    }
}
