//! Pool registry, test, and metrics endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::balancer::BalanceMethod;
use crate::config::PoolConfig;
use crate::registry::PoolSnapshot;
use crate::{PoolId, ServerId, metrics::WindowStats};

/// Body for creating a pool. The id is assigned by the registry.
#[derive(Debug, Deserialize)]
pub struct CreatePool {
    pub name: String,
    #[serde(default = "default_method")]
    pub method: BalanceMethod,
    pub members: Vec<ServerId>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_method() -> BalanceMethod {
    BalanceMethod::Weighted
}

fn default_enabled() -> bool {
    true
}

/// GET /api/v1/pools
pub async fn list_pools(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let pools = state.registry.read().await.pool_snapshots();
    Ok(Json(json!({
        "pools": pools,
        "count": pools.len(),
    })))
}

/// POST /api/v1/pools
pub async fn create_pool(
    State(state): State<ApiState>,
    Json(body): Json<CreatePool>,
) -> ApiResult<Json<PoolSnapshot>> {
    let mut registry = state.registry.write().await;
    let config = PoolConfig {
        id: registry.next_pool_id(),
        name: body.name,
        method: body.method,
        members: body.members,
        enabled: body.enabled,
    };
    let id = registry.add_pool(config)?;
    let snapshot = registry
        .pool_snapshot(id)
        .ok_or_else(|| ApiError::Internal("pool vanished after insert".into()))?;
    Ok(Json(snapshot))
}

/// GET /api/v1/pools/:id
pub async fn get_pool(
    State(state): State<ApiState>,
    Path(id): Path<PoolId>,
) -> ApiResult<Json<PoolSnapshot>> {
    state
        .registry
        .read()
        .await
        .pool_snapshot(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("pool {id} not found")))
}

/// PUT /api/v1/pools/:id
pub async fn update_pool(
    State(state): State<ApiState>,
    Path(id): Path<PoolId>,
    Json(body): Json<CreatePool>,
) -> ApiResult<Json<PoolSnapshot>> {
    let mut registry = state.registry.write().await;
    registry.update_pool(PoolConfig {
        id,
        name: body.name,
        method: body.method,
        members: body.members,
        enabled: body.enabled,
    })?;
    let snapshot = registry
        .pool_snapshot(id)
        .ok_or_else(|| ApiError::Internal("pool vanished after update".into()))?;
    Ok(Json(snapshot))
}

/// DELETE /api/v1/pools/:id
pub async fn delete_pool(
    State(state): State<ApiState>,
    Path(id): Path<PoolId>,
) -> ApiResult<Json<Value>> {
    state.registry.write().await.remove_pool(id)?;
    Ok(Json(json!({ "deleted": id })))
}

/// POST /api/v1/pools/:id/test
///
/// Probe every member of the pool immediately.
pub async fn test_pool(
    State(state): State<ApiState>,
    Path(id): Path<PoolId>,
) -> ApiResult<Json<Value>> {
    let samples = state.engine.test_pool(id).await??;
    let failed = samples.iter().filter(|s| !s.success).count();
    Ok(Json(json!({
        "pool_id": id,
        "checked": samples.len(),
        "failed": failed,
        "samples": samples,
    })))
}

/// GET /api/v1/pools/:id/stats
pub async fn pool_stats(
    State(state): State<ApiState>,
    Path(id): Path<PoolId>,
) -> ApiResult<Json<WindowStats>> {
    let stats = state.engine.pool_stats(id).await??;
    Ok(Json(stats))
}
