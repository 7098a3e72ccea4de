//! Request handlers for the control plane.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, CurrentTenant};
use crate::supervisor::{BotStatus, SupervisorError};

use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub tenant_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub tenant_id: String,
}

/// Issue a session token for a development tenant.
///
/// Only available in dev mode and only for tenants on the dev allowlist.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    if !state.auth.is_dev_mode() {
        return Err(AuthError::InvalidToken(
            "dev login is disabled outside dev mode".to_string(),
        ));
    }
    if !state.auth.is_dev_tenant(&req.tenant_id) {
        return Err(AuthError::UnknownTenant);
    }

    let token = state.auth.generate_token(&req.tenant_id)?;
    Ok(Json(LoginResponse {
        token,
        tenant_id: req.tenant_id,
    }))
}

/// Standard success envelope for bot lifecycle operations.
#[derive(Debug, Serialize)]
pub struct BotActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// Start the authenticated tenant's bot.
pub async fn start_bot(
    State(state): State<AppState>,
    tenant: CurrentTenant,
) -> Result<Json<BotActionResponse>, SupervisorError> {
    let pid = state.supervisor.start(tenant.id()).await?;
    Ok(Json(BotActionResponse {
        success: true,
        message: "bot started".to_string(),
        pid: Some(pid),
    }))
}

/// Stop the authenticated tenant's bot.
pub async fn stop_bot(
    State(state): State<AppState>,
    tenant: CurrentTenant,
) -> Result<Json<BotActionResponse>, SupervisorError> {
    state.supervisor.stop(tenant.id()).await?;
    Ok(Json(BotActionResponse {
        success: true,
        message: "bot stopped".to_string(),
        pid: None,
    }))
}

/// Restart the authenticated tenant's bot.
pub async fn restart_bot(
    State(state): State<AppState>,
    tenant: CurrentTenant,
) -> Result<Json<BotActionResponse>, SupervisorError> {
    let pid = state.supervisor.restart(tenant.id()).await?;
    Ok(Json(BotActionResponse {
        success: true,
        message: "bot restarted".to_string(),
        pid: Some(pid),
    }))
}

/// Report the authenticated tenant's bot status.
pub async fn bot_status(
    State(state): State<AppState>,
    tenant: CurrentTenant,
) -> Result<Json<BotStatus>, SupervisorError> {
    let status = state.supervisor.status(tenant.id()).await?;
    Ok(Json(status))
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: String,
}

/// Return the tenant's accumulated worker log.
pub async fn bot_logs(
    State(state): State<AppState>,
    tenant: CurrentTenant,
) -> Result<Json<LogsResponse>, SupervisorError> {
    let logs = state.supervisor.read_logs(tenant.id())?;
    Ok(Json(LogsResponse { logs }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}
