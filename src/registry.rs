//! Registry of monitored servers and pools.
//!
//! Configuration is created and edited through the administrative API;
//! the engine only reads it and writes the derived status fields after
//! each check. External readers take cloned snapshots so they never block
//! the engine's write path.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    PoolId, PoolStatus, Sample, ServerId, ServerStatus,
    config::{AlertConfig, Config, PoolConfig, ServerConfig},
};

/// Fraction of a hard alert threshold at which a reachable server enters
/// the warning band. Keeps status from flapping right at the alert line.
const WARNING_BAND: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct ServerEntry {
    pub config: ServerConfig,
    pub status: ServerStatus,
    pub consecutive_failures: u32,
    pub last_check: Option<DateTime<Utc>>,
    pub last_response_ms: Option<f64>,
    pub last_offset_ms: Option<f64>,
}

impl ServerEntry {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            status: ServerStatus::Unknown,
            consecutive_failures: 0,
            last_check: None,
            last_response_ms: None,
            last_offset_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub config: PoolConfig,
    pub status: PoolStatus,
    pub selected: Option<ServerId>,
}

impl PoolEntry {
    fn new(config: PoolConfig) -> Self {
        Self {
            config,
            status: PoolStatus::Failed,
            selected: None,
        }
    }
}

/// Serializable view of a server for API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSnapshot {
    pub id: ServerId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub weight: f64,
    pub enabled: bool,
    pub status: ServerStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub last_response_ms: Option<f64>,
    pub last_offset_ms: Option<f64>,
}

/// Serializable view of a pool for API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub name: String,
    pub method: crate::balancer::BalanceMethod,
    pub members: Vec<ServerId>,
    pub enabled: bool,
    pub status: PoolStatus,
    pub selected: Option<ServerId>,
}

/// Rejected administrative change.
#[derive(Debug)]
pub enum RegistryError {
    DuplicateId(String),
    NotFound(String),
    InvalidMember(String),
    InvalidValue(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateId(msg) => write!(f, "duplicate id: {}", msg),
            RegistryError::NotFound(msg) => write!(f, "not found: {}", msg),
            RegistryError::InvalidMember(msg) => write!(f, "invalid pool member: {}", msg),
            RegistryError::InvalidValue(msg) => write!(f, "invalid value: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Debug, Default)]
pub struct Registry {
    servers: BTreeMap<ServerId, ServerEntry>,
    pools: BTreeMap<PoolId, PoolEntry>,
}

impl Registry {
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let mut registry = Registry::default();
        for server in &config.servers {
            registry.add_server(server.clone())?;
        }
        for pool in &config.pools {
            registry.add_pool(pool.clone())?;
        }
        Ok(registry)
    }

    fn validate_server(config: &ServerConfig) -> Result<(), RegistryError> {
        if config.host.trim().is_empty() {
            return Err(RegistryError::InvalidValue(
                "server host must not be empty".into(),
            ));
        }
        if config.weight < 0.0 || !config.weight.is_finite() {
            return Err(RegistryError::InvalidValue(
                "server weight must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    fn validate_pool(&self, config: &PoolConfig) -> Result<(), RegistryError> {
        if config.members.is_empty() {
            return Err(RegistryError::InvalidValue(
                "pool must have at least one member".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for member in &config.members {
            if !self.servers.contains_key(member) {
                return Err(RegistryError::InvalidMember(format!(
                    "server {member} does not exist"
                )));
            }
            if !seen.insert(*member) {
                return Err(RegistryError::InvalidMember(format!(
                    "server {member} listed twice"
                )));
            }
        }
        Ok(())
    }

    // === server CRUD (administrative boundary) ===

    pub fn add_server(&mut self, config: ServerConfig) -> Result<ServerId, RegistryError> {
        Self::validate_server(&config)?;
        if self.servers.contains_key(&config.id) {
            return Err(RegistryError::DuplicateId(format!("server {}", config.id)));
        }
        let id = config.id;
        self.servers.insert(id, ServerEntry::new(config));
        Ok(id)
    }

    /// Allocate the next free server id for create requests that omit one.
    pub fn next_server_id(&self) -> ServerId {
        self.servers.keys().max().map_or(1, |max| max + 1)
    }

    pub fn next_pool_id(&self) -> PoolId {
        self.pools.keys().max().map_or(1, |max| max + 1)
    }

    pub fn update_server(&mut self, config: ServerConfig) -> Result<(), RegistryError> {
        Self::validate_server(&config)?;
        let entry = self
            .servers
            .get_mut(&config.id)
            .ok_or_else(|| RegistryError::NotFound(format!("server {}", config.id)))?;
        entry.config = config;
        Ok(())
    }

    pub fn remove_server(&mut self, id: ServerId) -> Result<(), RegistryError> {
        if self.servers.remove(&id).is_none() {
            return Err(RegistryError::NotFound(format!("server {id}")));
        }
        // drop the server from any pool that references it
        for pool in self.pools.values_mut() {
            pool.config.members.retain(|m| *m != id);
            if pool.selected == Some(id) {
                pool.selected = None;
            }
        }
        Ok(())
    }

    // === pool CRUD ===

    pub fn add_pool(&mut self, config: PoolConfig) -> Result<PoolId, RegistryError> {
        self.validate_pool(&config)?;
        if self.pools.contains_key(&config.id) {
            return Err(RegistryError::DuplicateId(format!("pool {}", config.id)));
        }
        let id = config.id;
        self.pools.insert(id, PoolEntry::new(config));
        Ok(id)
    }

    pub fn update_pool(&mut self, config: PoolConfig) -> Result<(), RegistryError> {
        self.validate_pool(&config)?;
        let entry = self
            .pools
            .get_mut(&config.id)
            .ok_or_else(|| RegistryError::NotFound(format!("pool {}", config.id)))?;
        if let Some(selected) = entry.selected {
            if !config.members.contains(&selected) {
                entry.selected = None;
            }
        }
        entry.config = config;
        Ok(())
    }

    pub fn remove_pool(&mut self, id: PoolId) -> Result<(), RegistryError> {
        self.pools
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound(format!("pool {id}")))
    }

    // === reads ===

    pub fn server(&self, id: ServerId) -> Option<&ServerEntry> {
        self.servers.get(&id)
    }

    pub fn pool(&self, id: PoolId) -> Option<&PoolEntry> {
        self.pools.get(&id)
    }

    pub fn enabled_servers(&self) -> Vec<ServerConfig> {
        self.servers
            .values()
            .filter(|e| e.config.enabled)
            .map(|e| e.config.clone())
            .collect()
    }

    pub fn enabled_pools(&self) -> Vec<PoolConfig> {
        self.pools
            .values()
            .filter(|e| e.config.enabled)
            .map(|e| e.config.clone())
            .collect()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn server_snapshots(&self) -> Vec<ServerSnapshot> {
        self.servers.values().map(snapshot_server).collect()
    }

    pub fn server_snapshot(&self, id: ServerId) -> Option<ServerSnapshot> {
        self.servers.get(&id).map(snapshot_server)
    }

    pub fn pool_snapshots(&self) -> Vec<PoolSnapshot> {
        self.pools.values().map(snapshot_pool).collect()
    }

    pub fn pool_snapshot(&self, id: PoolId) -> Option<PoolSnapshot> {
        self.pools.get(&id).map(snapshot_pool)
    }

    // === engine-side mutation of derived fields ===

    /// Fold one check outcome into the server's derived status.
    ///
    /// `max_retry_attempts` consecutive failures take the server offline;
    /// a single success brings it back. A reachable server whose latest
    /// reading sits inside the soft band below the alert thresholds is
    /// marked `warning` instead of `online`.
    pub fn apply_sample(
        &mut self,
        sample: &Sample,
        max_retry_attempts: u32,
        thresholds: &AlertConfig,
    ) {
        let Some(entry) = self.servers.get_mut(&sample.server_id) else {
            return;
        };

        entry.last_check = Some(sample.timestamp);

        if sample.success {
            entry.consecutive_failures = 0;
            entry.last_response_ms = sample.response_time_ms;
            entry.last_offset_ms = sample.offset_ms;

            let soft_response = thresholds.response_time_ms * WARNING_BAND;
            let soft_offset = thresholds.offset_ms * WARNING_BAND;
            let in_warning_band = sample
                .response_time_ms
                .is_some_and(|resp| resp >= soft_response)
                || sample
                    .offset_ms
                    .is_some_and(|off| off.abs() >= soft_offset);

            entry.status = if in_warning_band {
                ServerStatus::Warning
            } else {
                ServerStatus::Online
            };
        } else {
            entry.consecutive_failures += 1;
            if entry.consecutive_failures >= max_retry_attempts {
                entry.status = ServerStatus::Offline;
            }
        }
    }

    /// Record the balancer's decision for a pool.
    pub fn apply_selection(
        &mut self,
        pool_id: PoolId,
        selected: Option<ServerId>,
        status: PoolStatus,
    ) {
        if let Some(pool) = self.pools.get_mut(&pool_id) {
            pool.selected = selected;
            pool.status = status;
        }
    }
}

fn snapshot_server(entry: &ServerEntry) -> ServerSnapshot {
    ServerSnapshot {
        id: entry.config.id,
        name: entry.config.name.clone(),
        host: entry.config.host.clone(),
        port: entry.config.port,
        weight: entry.config.weight,
        enabled: entry.config.enabled,
        status: entry.status,
        last_check: entry.last_check,
        last_response_ms: entry.last_response_ms,
        last_offset_ms: entry.last_offset_ms,
    }
}

fn snapshot_pool(entry: &PoolEntry) -> PoolSnapshot {
    PoolSnapshot {
        id: entry.config.id,
        name: entry.config.name.clone(),
        method: entry.config.method,
        members: entry.config.members.clone(),
        enabled: entry.config.enabled,
        status: entry.status,
        selected: entry.selected,
    }
}
