use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;

use crate::hooks::HubObserver;
use crate::protocol::{self, VoteMessage};
use crate::registry::ConnectionRegistry;
use crate::types::DisconnectReason;

/// Outcome of a single fan-out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub pruned: usize,
}

/// Fans messages out to every registered connection
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn HubObserver>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, observer: Arc<dyn HubObserver>) -> Self {
        Self { registry, observer }
    }

    /// Deliver `msg` to every connection registered at call time.
    ///
    /// A connection whose delivery fails is removed and closed; the rest still
    /// receive the message. This never fails as a whole.
    pub async fn broadcast(&self, msg: &VoteMessage) -> DispatchReport {
        let frame: Utf8Bytes = match protocol::encode(msg) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast message");
                return DispatchReport::default();
            }
        };

        let mut report = DispatchReport::default();
        let mut failed = Vec::new();
        self.registry
            .for_each(|conn| match conn.send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(conn_id = %conn.id, error = %e, "Failed to deliver");
                    failed.push(conn.clone());
                }
            })
            .await;

        for conn in failed {
            self.registry.remove(&conn.id).await;
            if conn.close() {
                let reason = DisconnectReason::DeliveryFailed;
                self.observer.on_disconnect(&conn.id, &reason);
            }
            report.pruned += 1;
        }

        tracing::debug!(
            jury = msg.jury.as_str(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Connection;
    use crate::types::{Ballot, Role};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingObserver {
        disconnects: Mutex<Vec<(String, DisconnectReason)>>,
    }

    impl HubObserver for RecordingObserver {
        fn on_disconnect(&self, conn_id: &str, reason: &DisconnectReason) {
            self.disconnects
                .lock()
                .unwrap()
                .push((conn_id.to_string(), reason.clone()));
        }
    }

    async fn register(
        registry: &ConnectionRegistry,
        capacity: usize,
    ) -> (Arc<Connection>, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Arc::new(Connection::new(tx));
        registry.add(conn.clone()).await;
        (conn, rx)
    }

    fn guilty_from(role: Role) -> VoteMessage {
        VoteMessage::relay(&Ballot::new(role, "guilty"))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = Dispatcher::new(registry.clone(), observer);

        let (_a, mut rx_a) = register(&registry, 4).await;
        let (_b, mut rx_b) = register(&registry, 4).await;
        let (_c, mut rx_c) = register(&registry, 4).await;

        let report = dispatcher.broadcast(&guilty_from(Role::Left)).await;
        assert_eq!(report, DispatchReport { delivered: 3, pruned: 0 });

        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            let frame = rx.recv().await.unwrap();
            assert_eq!(frame.as_str(), r#"{"jury":"LEFT","vote":"guilty"}"#);
        }
    }

    #[tokio::test]
    async fn test_failed_recipient_is_pruned_without_affecting_others() {
        let registry = Arc::new(ConnectionRegistry::new());
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = Dispatcher::new(registry.clone(), observer.clone());

        let (dead, rx_dead) = register(&registry, 4).await;
        let (alive, mut rx_alive) = register(&registry, 4).await;
        drop(rx_dead);

        let report = dispatcher.broadcast(&guilty_from(Role::Right)).await;
        assert_eq!(report, DispatchReport { delivered: 1, pruned: 1 });

        assert!(rx_alive.recv().await.is_some());
        assert!(!registry.contains(&dead.id).await);
        assert!(registry.contains(&alive.id).await);
        assert!(dead.is_closed());
        assert!(!alive.is_closed());

        let disconnects = observer.disconnects.lock().unwrap();
        assert_eq!(
            *disconnects,
            vec![(dead.id.clone(), DisconnectReason::DeliveryFailed)]
        );
    }

    #[tokio::test]
    async fn test_full_queue_counts_as_dead_and_is_not_retried() {
        let registry = Arc::new(ConnectionRegistry::new());
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = Dispatcher::new(registry.clone(), observer);

        let (slow, mut rx_slow) = register(&registry, 1).await;

        dispatcher.broadcast(&guilty_from(Role::Left)).await;
        let report = dispatcher.broadcast(&guilty_from(Role::Right)).await;
        assert_eq!(report, DispatchReport { delivered: 0, pruned: 1 });
        assert!(!registry.contains(&slow.id).await);

        // Only the first frame made it; nothing is redelivered later
        let report = dispatcher.broadcast(&guilty_from(Role::Center)).await;
        assert_eq!(report, DispatchReport::default());
        assert!(rx_slow.recv().await.is_some());
        assert!(rx_slow.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_already_closed_connection_reports_no_second_disconnect() {
        let registry = Arc::new(ConnectionRegistry::new());
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = Dispatcher::new(registry.clone(), observer.clone());

        let (conn, _rx) = register(&registry, 4).await;
        conn.close();

        let report = dispatcher.broadcast(&guilty_from(Role::Left)).await;
        assert_eq!(report.pruned, 1);
        assert!(observer.disconnects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_with_no_connections() {
        let registry = Arc::new(ConnectionRegistry::new());
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = Dispatcher::new(registry, observer);
        let report = dispatcher.broadcast(&guilty_from(Role::Left)).await;
        assert_eq!(report, DispatchReport::default());
    }
}
