mod funnel;
mod round;

pub use funnel::{FunnelClosed, VoteFunnel};
pub use round::{Aggregator, RoundSnapshot, SubmitOutcome};

use crate::broadcast::Dispatcher;
use crate::config::HubConfig;
use crate::hooks::{HubObserver, TracingObserver};
use crate::registry::ConnectionRegistry;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: HubConfig,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Dispatcher,
    pub funnel: VoteFunnel,
    pub observer: Arc<dyn HubObserver>,
}

impl AppState {
    /// Build the hub and spawn its vote funnel. Must be called inside a Tokio runtime.
    pub fn new(config: HubConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(config: HubConfig, observer: Arc<dyn HubObserver>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), observer.clone());
        // The funnel runs for the process lifetime; it stops once every handle is dropped
        let (funnel, _handle) =
            VoteFunnel::spawn(dispatcher.clone(), observer.clone(), config.funnel_queue);

        Self {
            config,
            registry,
            dispatcher,
            funnel,
            observer,
        }
    }
}
