//! Alert listing, lifecycle, and configuration endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::alerts::{Alert, AlertId};
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::config::AlertConfig;
use crate::engine::AlertAction;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    /// Restrict the listing to active and acknowledged alerts.
    #[serde(default)]
    open: bool,
}

/// GET /api/v1/alerts
pub async fn list_alerts(
    State(state): State<ApiState>,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Json<Value>> {
    let alerts = state.engine.alerts(query.open).await?;
    Ok(Json(json!({
        "alerts": alerts,
        "count": alerts.len(),
    })))
}

/// GET /api/v1/alerts/:id
pub async fn get_alert(
    State(state): State<ApiState>,
    Path(id): Path<AlertId>,
) -> ApiResult<Json<Alert>> {
    state
        .engine
        .alert(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("alert {id} not found")))
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    /// Who is acknowledging; recorded on the alert.
    acknowledged_by: Option<String>,
}

/// POST /api/v1/alerts/:id/acknowledge
///
/// The body is optional; an anonymous acknowledgment is recorded without
/// an actor.
pub async fn acknowledge(
    State(state): State<ApiState>,
    Path(id): Path<AlertId>,
    body: Option<Json<AcknowledgeRequest>>,
) -> ApiResult<Json<Alert>> {
    let by = body.and_then(|Json(req)| req.acknowledged_by);
    Ok(Json(
        state
            .engine
            .alert_action(id, AlertAction::Acknowledge { by })
            .await??,
    ))
}

/// POST /api/v1/alerts/:id/resolve
pub async fn resolve(
    State(state): State<ApiState>,
    Path(id): Path<AlertId>,
) -> ApiResult<Json<Alert>> {
    Ok(Json(
        state.engine.alert_action(id, AlertAction::Resolve).await??,
    ))
}

/// POST /api/v1/alerts/:id/dismiss
pub async fn dismiss(
    State(state): State<ApiState>,
    Path(id): Path<AlertId>,
) -> ApiResult<Json<Alert>> {
    Ok(Json(
        state.engine.alert_action(id, AlertAction::Dismiss).await??,
    ))
}

/// GET /api/v1/alerts/config
pub async fn get_config(State(state): State<ApiState>) -> ApiResult<Json<AlertConfig>> {
    Ok(Json(state.engine.alert_config().await?))
}

/// PUT /api/v1/alerts/config
pub async fn update_config(
    State(state): State<ApiState>,
    Json(config): Json<AlertConfig>,
) -> ApiResult<Json<AlertConfig>> {
    state.engine.update_alert_config(config).await??;
    Ok(Json(state.engine.alert_config().await?))
}
