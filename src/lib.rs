pub mod alerts;
pub mod api;
pub mod balancer;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod probe;
pub mod registry;
pub mod storage;
pub mod sync;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a monitored time-reference server.
pub type ServerId = u64;

/// Identifier for a server pool.
pub type PoolId = u64;

/// Derived health status of a single server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    Warning,
    Unknown,
}

/// Derived health status of a pool, aggregated from its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    Active,
    Degraded,
    Failed,
}

/// Classification of a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Timeout,
    Unreachable,
    ProtocolError,
}

/// One immutable check outcome for one server.
///
/// Samples are append-only. On success `response_time_ms` and `offset_ms`
/// carry measurements; on failure both are `None` and `error_kind` says why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub server_id: ServerId,
    pub response_time_ms: Option<f64>,
    pub offset_ms: Option<f64>,
    pub success: bool,
    pub error_kind: Option<ProbeErrorKind>,
}

impl Sample {
    pub fn ok(server_id: ServerId, response_time_ms: f64, offset_ms: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            server_id,
            response_time_ms: Some(response_time_ms),
            offset_ms: Some(offset_ms),
            success: true,
            error_kind: None,
        }
    }

    pub fn failed(server_id: ServerId, kind: ProbeErrorKind) -> Self {
        Self {
            timestamp: Utc::now(),
            server_id,
            response_time_ms: None,
            offset_ms: None,
            success: false,
            error_kind: Some(kind),
        }
    }

    /// Synthetic sample recorded after a successful clock correction.
    ///
    /// The local clock now matches the reference, so the offset is
    /// recorded as zero.
    pub fn post_correction(server_id: ServerId) -> Self {
        Self {
            timestamp: Utc::now(),
            server_id,
            response_time_ms: None,
            offset_ms: Some(0.0),
            success: true,
            error_kind: None,
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Online => write!(f, "online"),
            ServerStatus::Offline => write!(f, "offline"),
            ServerStatus::Warning => write!(f, "warning"),
            ServerStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolStatus::Active => write!(f, "active"),
            PoolStatus::Degraded => write!(f, "degraded"),
            PoolStatus::Failed => write!(f, "failed"),
        }
    }
}
