//! Shared state passed to all API handlers

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::EngineHandle;
use crate::registry::Registry;
use crate::storage::MetricStore;

#[derive(Clone)]
pub struct ApiState {
    /// Handle to the monitor engine for checks, stats, and alerts
    pub engine: EngineHandle,

    /// Shared server and pool registry
    pub registry: Arc<RwLock<Registry>>,

    /// Sample history backend
    pub store: Arc<dyn MetricStore>,
}

impl ApiState {
    pub fn new(
        engine: EngineHandle,
        registry: Arc<RwLock<Registry>>,
        store: Arc<dyn MetricStore>,
    ) -> Self {
        Self {
            engine,
            registry,
            store,
        }
    }
}
