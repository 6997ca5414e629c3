use crate::protocol::VoteMessage;
use crate::types::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct TallyEntry {
    vote: String,
    /// Arrival order of this entry within the aggregator, used for tie-breaks
    seq: u64,
}

/// Read-only view of the current round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub round: RoundNo,
    pub votes: Vec<(Role, String)>,
}

/// What happened when a ballot was submitted
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub round: RoundNo,
    /// Distinct roles recorded in the round after this ballot
    pub tallied: usize,
    /// Verbatim relay of the ballot
    pub relay: VoteMessage,
    /// Present when this ballot completed the round
    pub decision: Option<Decision>,
}

/// Round state machine: collects one vote per role, decides once every role
/// has voted, then starts the next round with an empty tally.
#[derive(Debug)]
pub struct Aggregator {
    round_no: RoundNo,
    tally: BTreeMap<Role, TallyEntry>,
    next_seq: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            round_no: 1,
            tally: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn round_no(&self) -> RoundNo {
        self.round_no
    }

    pub fn tallied(&self) -> usize {
        self.tally.len()
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round: self.round_no,
            votes: self
                .tally
                .iter()
                .map(|(role, entry)| (*role, entry.vote.clone()))
                .collect(),
        }
    }

    /// Record a ballot. A repeat vote from the same role overwrites its earlier
    /// one and does not advance the round.
    pub fn submit(&mut self, ballot: Ballot) -> SubmitOutcome {
        let relay = VoteMessage::relay(&ballot);
        let seq = self.next_seq;
        self.next_seq += 1;

        self.tally.insert(
            ballot.role,
            TallyEntry {
                vote: ballot.vote,
                seq,
            },
        );

        let round = self.round_no;
        let tallied = self.tally.len();
        let decision = if tallied == Role::COUNT {
            Some(self.decide())
        } else {
            None
        };

        SubmitOutcome {
            round,
            tallied,
            relay,
            decision,
        }
    }

    /// Compute the majority for the completed round and reset for the next one
    fn decide(&mut self) -> Decision {
        let tally = std::mem::take(&mut self.tally);
        let (verdict, counts) = majority(tally.into_values());
        let decision = Decision {
            round: self.round_no,
            verdict,
            counts,
            decided_at: chrono::Utc::now().to_rfc3339(),
        };
        self.round_no += 1;
        decision
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Count votes per label. The label with the highest count wins; among tied
/// labels the one whose standing vote arrived first wins.
fn majority(entries: impl Iterator<Item = TallyEntry>) -> (String, Vec<(String, usize)>) {
    let mut entries: Vec<TallyEntry> = entries.collect();
    entries.sort_by_key(|entry| entry.seq);

    // First-seen order, so the strict comparison below favours earlier labels
    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in entries {
        match counts.iter_mut().find(|(label, _)| *label == entry.vote) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.vote, 1)),
        }
    }

    let mut best: Option<&(String, usize)> = None;
    for candidate in &counts {
        match best {
            Some((_, count)) if candidate.1 <= *count => {}
            _ => best = Some(candidate),
        }
    }
    let verdict = best.map(|(label, _)| label.clone()).unwrap_or_default();

    (verdict, counts)
}
