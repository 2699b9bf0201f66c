//! Helper functions and scripted collaborators for integration tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use ntp_sentinel::balancer::BalanceMethod;
use ntp_sentinel::config::{Config, PoolConfig, ServerConfig};
use ntp_sentinel::engine::EngineHandle;
use ntp_sentinel::probe::{ClockControl, CorrectionError, ProbeError, ProbeReading, TimeSource};
use ntp_sentinel::registry::Registry;
use ntp_sentinel::storage::{MemoryStore, MetricStore};
use ntp_sentinel::ServerId;

/// One scripted probe result.
#[derive(Debug, Clone)]
pub enum Step {
    Ok { response_ms: f64, offset_ms: f64 },
    Timeout,
    Unreachable,
}

/// Time source that replays a per-host script, then falls back to a
/// healthy default reading.
pub struct ScriptedTimeSource {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
}

impl ScriptedTimeSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub async fn script(&self, host: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .await
            .entry(host.to_string())
            .or_default()
            .extend(steps);
    }
}

#[async_trait]
impl TimeSource for ScriptedTimeSource {
    async fn query(
        &self,
        host: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Result<ProbeReading, ProbeError> {
        let step = self
            .scripts
            .lock()
            .await
            .get_mut(host)
            .and_then(|s| s.pop_front());

        match step {
            Some(Step::Ok {
                response_ms,
                offset_ms,
            }) => Ok(ProbeReading {
                round_trip_ms: response_ms,
                offset_ms,
            }),
            Some(Step::Timeout) => Err(ProbeError::Timeout),
            Some(Step::Unreachable) => Err(ProbeError::Unreachable("scripted".into())),
            None => Ok(ProbeReading {
                round_trip_ms: 20.0,
                offset_ms: 1.0,
            }),
        }
    }
}

/// Clock that records every applied correction.
pub struct RecordingClock {
    pub corrections: Mutex<Vec<f64>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self {
            corrections: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ClockControl for RecordingClock {
    async fn apply_correction(&self, offset_ms: f64) -> Result<(), CorrectionError> {
        self.corrections.lock().await.push(offset_ms);
        Ok(())
    }
}

pub fn server(id: ServerId, host: &str) -> ServerConfig {
    ServerConfig {
        id,
        name: format!("server-{id}"),
        host: host.to_string(),
        port: 123,
        weight: 1.0,
        enabled: true,
    }
}

pub fn pool(members: Vec<ServerId>, method: BalanceMethod) -> PoolConfig {
    PoolConfig {
        id: 1,
        name: "primary".to_string(),
        method,
        members,
        enabled: true,
    }
}

/// Config with a long interval so only manual checks drive the engine.
pub fn test_config(servers: Vec<ServerConfig>, pools: Vec<PoolConfig>) -> Config {
    let mut config = Config::default();
    config.monitor.sync_interval_secs = 3600;
    config.servers = servers;
    config.pools = pools;
    config
}

pub struct TestRig {
    pub handle: EngineHandle,
    pub registry: Arc<RwLock<Registry>>,
    pub store: Arc<MemoryStore>,
    pub source: Arc<ScriptedTimeSource>,
    pub clock: Arc<RecordingClock>,
}

pub fn spawn(config: &Config) -> TestRig {
    let registry = Arc::new(RwLock::new(Registry::from_config(config).unwrap()));
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(ScriptedTimeSource::new());
    let clock = Arc::new(RecordingClock::new());

    let handle = EngineHandle::spawn(
        config,
        registry.clone(),
        source.clone(),
        clock.clone(),
        store.clone() as Arc<dyn MetricStore>,
    );

    TestRig {
        handle,
        registry,
        store,
        source,
        clock,
    }
}
