//! Single serialized path for votes
//!
//! Every session submits into one queue. One task owns the [`Aggregator`] and
//! the broadcast side, so tally, decision, reset and fan-out happen as one
//! unit per vote, in arrival order.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::round::{Aggregator, RoundSnapshot};
use crate::broadcast::Dispatcher;
use crate::hooks::HubObserver;
use crate::protocol::VoteMessage;
use crate::types::Ballot;

#[derive(Debug, thiserror::Error)]
#[error("vote funnel is not running")]
pub struct FunnelClosed;

enum Command {
    Vote(Ballot),
    Snapshot(oneshot::Sender<RoundSnapshot>),
}

/// Cloneable handle for feeding the funnel
#[derive(Clone)]
pub struct VoteFunnel {
    tx: mpsc::Sender<Command>,
}

impl VoteFunnel {
    /// Start the funnel task
    pub fn spawn(
        dispatcher: Dispatcher,
        observer: Arc<dyn HubObserver>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(rx, Aggregator::new(), dispatcher, observer));
        (Self { tx }, handle)
    }

    /// Queue a validated ballot. Waits if the queue is full.
    pub async fn submit(&self, ballot: Ballot) -> Result<(), FunnelClosed> {
        self.tx
            .send(Command::Vote(ballot))
            .await
            .map_err(|_| FunnelClosed)
    }

    /// Current round and tally, as seen after every earlier submission
    pub async fn snapshot(&self) -> Result<RoundSnapshot, FunnelClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| FunnelClosed)?;
        rx.await.map_err(|_| FunnelClosed)
    }
}

async fn run(
    mut rx: mpsc::Receiver<Command>,
    mut aggregator: Aggregator,
    dispatcher: Dispatcher,
    observer: Arc<dyn HubObserver>,
) {
    tracing::debug!("Vote funnel started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Vote(ballot) => {
                let outcome = aggregator.submit(ballot.clone());
                observer.on_vote_recorded(outcome.round, &ballot, outcome.tallied);
                dispatcher.broadcast(&outcome.relay).await;

                if let Some(decision) = outcome.decision {
                    observer.on_round_decided(&decision);
                    dispatcher
                        .broadcast(&VoteMessage::decision(&decision))
                        .await;
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(aggregator.snapshot());
            }
        }
    }

    tracing::debug!("Vote funnel stopped");
}
