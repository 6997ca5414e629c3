//! Live set of connected jury clients

use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};

use crate::types::ConnId;

/// Transport-level failures. Always local to one connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    Socket(#[from] axum::Error),

    #[error("no message received within {0:?}")]
    ReadTimeout(std::time::Duration),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(std::time::Duration),

    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection is closed")]
    Closed,
}

/// Handle to one connected client.
///
/// Outbound frames go through a bounded queue drained by the connection's
/// writer task, so a broadcast never waits on a slow socket.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnId,
    tx: mpsc::Sender<Utf8Bytes>,
    closed: watch::Sender<bool>,
}

impl Connection {
    pub fn new(tx: mpsc::Sender<Utf8Bytes>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: ulid::Ulid::new().to_string(),
            tx,
            closed,
        }
    }

    /// Queue a frame for delivery. Any failure means the connection is dead.
    pub fn send(&self, frame: Utf8Bytes) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    /// Mark the connection closed. Returns true only for the first call.
    pub fn close(&self) -> bool {
        !self.closed.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// Registry of live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, conn: Arc<Connection>) {
        let mut connections = self.connections.write().await;
        connections.insert(conn.id.clone(), conn);
    }

    /// Remove a connection. Removing an unknown or already-removed id is a no-op.
    pub async fn remove(&self, id: &str) -> Option<Arc<Connection>> {
        self.connections.write().await.remove(id)
    }

    /// Copy of the current membership. The lock is released before returning.
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Call `f` for every connection registered at call time.
    ///
    /// Iterates a snapshot, so `f` may trigger removals without affecting the
    /// iteration.
    pub async fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Connection>),
    {
        for conn in self.snapshot().await {
            f(&conn);
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.connections.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
