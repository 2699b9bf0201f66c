//! Server registry, test, and metrics endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::config::ServerConfig;
use crate::registry::ServerSnapshot;
use crate::storage::SampleQuery;
use crate::{ServerId, metrics::WindowStats};

/// Body for creating a server. The id is assigned by the registry.
#[derive(Debug, Deserialize)]
pub struct CreateServer {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_port() -> u16 {
    123
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

/// GET /api/v1/servers
pub async fn list_servers(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let servers = state.registry.read().await.server_snapshots();
    Ok(Json(json!({
        "servers": servers,
        "count": servers.len(),
    })))
}

/// POST /api/v1/servers
pub async fn create_server(
    State(state): State<ApiState>,
    Json(body): Json<CreateServer>,
) -> ApiResult<Json<ServerSnapshot>> {
    let mut registry = state.registry.write().await;
    let config = ServerConfig {
        id: registry.next_server_id(),
        name: body.name,
        host: body.host,
        port: body.port,
        weight: body.weight,
        enabled: body.enabled,
    };
    let id = registry.add_server(config)?;
    let snapshot = registry
        .server_snapshot(id)
        .ok_or_else(|| ApiError::Internal("server vanished after insert".into()))?;
    Ok(Json(snapshot))
}

/// GET /api/v1/servers/:id
pub async fn get_server(
    State(state): State<ApiState>,
    Path(id): Path<ServerId>,
) -> ApiResult<Json<ServerSnapshot>> {
    state
        .registry
        .read()
        .await
        .server_snapshot(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("server {id} not found")))
}

/// PUT /api/v1/servers/:id
pub async fn update_server(
    State(state): State<ApiState>,
    Path(id): Path<ServerId>,
    Json(body): Json<CreateServer>,
) -> ApiResult<Json<ServerSnapshot>> {
    let mut registry = state.registry.write().await;
    registry.update_server(ServerConfig {
        id,
        name: body.name,
        host: body.host,
        port: body.port,
        weight: body.weight,
        enabled: body.enabled,
    })?;
    let snapshot = registry
        .server_snapshot(id)
        .ok_or_else(|| ApiError::Internal("server vanished after update".into()))?;
    Ok(Json(snapshot))
}

/// DELETE /api/v1/servers/:id
pub async fn delete_server(
    State(state): State<ApiState>,
    Path(id): Path<ServerId>,
) -> ApiResult<Json<Value>> {
    state.registry.write().await.remove_server(id)?;
    Ok(Json(json!({ "deleted": id })))
}

/// POST /api/v1/servers/:id/test
///
/// Probe the server immediately and return the resulting sample.
pub async fn test_server(
    State(state): State<ApiState>,
    Path(id): Path<ServerId>,
) -> ApiResult<Json<Value>> {
    let sample = state.engine.test_server(id).await??;
    Ok(Json(json!(sample)))
}

/// GET /api/v1/servers/:id/stats
pub async fn server_stats(
    State(state): State<ApiState>,
    Path(id): Path<ServerId>,
) -> ApiResult<Json<WindowStats>> {
    let stats = state.engine.server_stats(id).await??;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct SamplesQuery {
    start: Option<chrono::DateTime<chrono::Utc>>,
    end: Option<chrono::DateTime<chrono::Utc>>,
    limit: Option<usize>,
}

/// GET /api/v1/servers/:id/samples
///
/// Raw sample history within a time range, oldest first.
pub async fn server_samples(
    State(state): State<ApiState>,
    Path(id): Path<ServerId>,
    Query(query): Query<SamplesQuery>,
) -> ApiResult<Json<Value>> {
    if state.registry.read().await.server(id).is_none() {
        return Err(ApiError::NotFound(format!("server {id} not found")));
    }

    let limit = query.limit.unwrap_or(1000).min(10_000);
    let samples = state
        .store
        .query(
            id,
            SampleQuery {
                since: query.start,
                until: query.end,
                limit: Some(limit),
            },
        )
        .await?;

    Ok(Json(json!({
        "server_id": id,
        "count": samples.len(),
        "samples": samples,
    })))
}
