//! Per-connection session: one reader feeding the vote funnel, one writer
//! draining the connection's outbound queue.

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures::{
    sink::{Sink, SinkExt},
    stream::{Stream, StreamExt},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::protocol::{self, CodecError};
use crate::registry::{Connection, TransportError};
use crate::state::AppState;
use crate::types::DisconnectReason;

/// Handle individual WebSocket connection
pub(super) async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();
    let (tx, rx) = outbound_channel(state.config.outbound_queue);

    let conn = Arc::new(Connection::new(tx));
    state.registry.add(conn.clone()).await;
    state.observer.on_connect(&conn.id);

    let writer = tokio::spawn(write_loop(sender, rx, conn.clone(), state.clone()));

    let reason = read_loop(receiver, &conn, &state).await;

    state.registry.remove(&conn.id).await;
    if conn.close() {
        state.observer.on_disconnect(&conn.id, &reason);
    }

    if let Err(e) = writer.await {
        tracing::error!(conn_id = %conn.id, error = %e, "Writer task failed");
    }
}

/// Bounded queue feeding the writer task. A zero capacity is raised to one.
fn outbound_channel(capacity: usize) -> (mpsc::Sender<Utf8Bytes>, mpsc::Receiver<Utf8Bytes>) {
    mpsc::channel(capacity.max(1))
}

/// Read frames until the connection ends, handing each valid ballot to the
/// vote funnel. Returns why the session ended.
///
/// Any malformed frame or unknown role ends the session. Also returns early
/// if the connection is closed from elsewhere (failed delivery).
pub async fn read_loop<S>(
    mut receiver: S,
    conn: &Connection,
    state: &AppState,
) -> DisconnectReason
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let read_timeout = state.config.read_timeout;

    loop {
        let next = tokio::select! {
            _ = conn.closed() => return DisconnectReason::DeliveryFailed,
            next = next_message(&mut receiver, read_timeout) => next,
        };

        let msg = match next {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(e))) => {
                return DisconnectReason::Transport(TransportError::from(e).to_string());
            }
            Ok(None) => return DisconnectReason::ClosedByPeer,
            Err(e) => return DisconnectReason::Transport(e.to_string()),
        };

        // Text and binary frames carry the same JSON message
        let payload = match &msg {
            Message::Text(text) => text.as_str(),
            Message::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(payload) => payload,
                Err(e) => {
                    return DisconnectReason::Malformed(format!("binary frame is not UTF-8: {}", e));
                }
            },
            Message::Close(_) => return DisconnectReason::ClosedByPeer,
            // Pongs for incoming pings are queued by the socket itself
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        tracing::debug!(conn_id = %conn.id, "Received message: {}", payload);

        let ballot = match protocol::decode(payload) {
            Ok(ballot) => ballot,
            Err(CodecError::InvalidRole(role)) => {
                return DisconnectReason::InvalidRole(role);
            }
            Err(e @ CodecError::Malformed(_)) => {
                return DisconnectReason::Malformed(e.to_string());
            }
        };

        if state.funnel.submit(ballot).await.is_err() {
            tracing::error!(conn_id = %conn.id, "Vote funnel is gone, dropping session");
            return DisconnectReason::HubShutdown;
        }
    }
}

async fn next_message<S>(
    receiver: &mut S,
    deadline: Option<Duration>,
) -> Result<Option<Result<Message, axum::Error>>, TransportError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, receiver.next())
            .await
            .map_err(|_| TransportError::ReadTimeout(deadline)),
        None => Ok(receiver.next().await),
    }
}

/// Drain the outbound queue onto the socket. A failed or stalled write kills
/// the connection.
async fn write_loop<S>(
    mut sender: S,
    mut rx: mpsc::Receiver<Utf8Bytes>,
    conn: Arc<Connection>,
    state: Arc<AppState>,
) where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let write_timeout = state.config.write_timeout;

    loop {
        let frame = tokio::select! {
            _ = conn.closed() => break,
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let write = tokio::time::timeout(write_timeout, sender.send(Message::Text(frame)));
        let err = match write.await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => TransportError::from(e),
            Err(_) => TransportError::WriteTimeout(write_timeout),
        };

        tracing::warn!(conn_id = %conn.id, error = %err, "Failed to write to client");
        state.registry.remove(&conn.id).await;
        if conn.close() {
            state
                .observer
                .on_disconnect(&conn.id, &DisconnectReason::Transport(err.to_string()));
        }
        return;
    }

    // Best effort; the peer may already be gone
    let _ = tokio::time::timeout(write_timeout, sender.send(Message::Close(None))).await;
}
