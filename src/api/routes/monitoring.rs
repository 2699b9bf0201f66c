//! Engine control and status endpoints

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::config::MonitorConfig;
use crate::storage::SampleQuery;
use crate::{PoolId, Sample, ServerId};

/// GET /api/v1/health
pub async fn health_check(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let registry = state.registry.read().await;
    Ok(Json(json!({
        "status": "ok",
        "servers": registry.server_count(),
        "pools": registry.pool_count(),
    })))
}

/// GET /api/v1/monitoring/status
pub async fn status(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let status = state.engine.status().await?;
    Ok(Json(json!(status)))
}

/// POST /api/v1/monitoring/check
///
/// Run a full check cycle immediately, bypassing the interval timer.
pub async fn check_now(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let report = state.engine.check_now().await?;
    Ok(Json(json!(report)))
}

/// POST /api/v1/monitoring/pause
pub async fn pause(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    state.engine.pause().await?;
    Ok(Json(json!({ "paused": true })))
}

/// POST /api/v1/monitoring/resume
pub async fn resume(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    state.engine.resume().await?;
    Ok(Json(json!({ "paused": false })))
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    server_id: Option<ServerId>,
    pool_id: Option<PoolId>,
    /// Seconds of sample history to include alongside the stats.
    period: Option<u64>,
    /// Bucket width in seconds; folds the sample history into
    /// fixed-width aggregates for charting.
    interval: Option<u64>,
}

/// GET /api/v1/metrics
///
/// Rolling-window metrics. `server_id` narrows to one server (with its
/// sample history, optionally folded into `interval`-second buckets),
/// `pool_id` to one pool's aggregate; with neither, the whole fleet's
/// per-server stats are returned.
pub async fn metrics(
    State(state): State<ApiState>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<Value>> {
    if query.server_id.is_some() && query.pool_id.is_some() {
        return Err(ApiError::InvalidRequest(
            "server_id and pool_id are mutually exclusive".into(),
        ));
    }
    let since = query
        .period
        .map(|secs| Utc::now() - Duration::seconds(secs.min(i64::MAX as u64) as i64));

    if let Some(id) = query.server_id {
        let stats = state.engine.server_stats(id).await??;
        let samples = state
            .store
            .query(
                id,
                SampleQuery {
                    since,
                    until: None,
                    limit: None,
                },
            )
            .await?;
        if let Some(interval) = query.interval {
            return Ok(Json(json!({
                "server_id": id,
                "window": stats,
                "buckets": bucket_samples(&samples, interval),
            })));
        }
        return Ok(Json(json!({
            "server_id": id,
            "window": stats,
            "samples": samples,
        })));
    }

    if let Some(id) = query.pool_id {
        let stats = state.engine.pool_stats(id).await??;
        return Ok(Json(json!({ "pool_id": id, "window": stats })));
    }

    // collect ids first so the registry lock is not held across engine calls
    let ids: Vec<ServerId> = {
        let registry = state.registry.read().await;
        registry.server_snapshots().iter().map(|s| s.id).collect()
    };
    let mut servers = Vec::with_capacity(ids.len());
    for id in ids {
        let stats = state.engine.server_stats(id).await??;
        servers.push(json!({ "server_id": id, "window": stats }));
    }
    Ok(Json(json!({ "servers": servers })))
}

/// Fold samples into fixed-width buckets keyed by the bucket start time,
/// oldest first. Empty buckets are omitted rather than zero-filled.
fn bucket_samples(samples: &[Sample], interval_secs: u64) -> Vec<Value> {
    let width = interval_secs.clamp(1, i64::MAX as u64) as i64;
    let mut buckets: BTreeMap<i64, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        let start = sample.timestamp.timestamp().div_euclid(width) * width;
        buckets.entry(start).or_default().push(sample);
    }

    buckets
        .into_iter()
        .map(|(start, group)| {
            let successes = group.iter().filter(|s| s.success).count();
            let avg_of = |values: Vec<f64>| {
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            };
            json!({
                "start": DateTime::from_timestamp(start, 0),
                "sample_count": group.len(),
                "success_count": successes,
                "uptime_percent": successes as f64 * 100.0 / group.len() as f64,
                "avg_response_ms": avg_of(group.iter().filter_map(|s| s.response_time_ms).collect()),
                "avg_offset_ms": avg_of(group.iter().filter_map(|s| s.offset_ms).collect()),
            })
        })
        .collect()
}

/// GET /api/v1/monitoring/config
pub async fn get_config(State(state): State<ApiState>) -> ApiResult<Json<MonitorConfig>> {
    Ok(Json(state.engine.monitor_config().await?))
}

/// PUT /api/v1/monitoring/config
pub async fn update_config(
    State(state): State<ApiState>,
    Json(config): Json<MonitorConfig>,
) -> ApiResult<Json<MonitorConfig>> {
    state.engine.update_monitor_config(config).await??;
    Ok(Json(state.engine.monitor_config().await?))
}
