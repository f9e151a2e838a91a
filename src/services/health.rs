//! Health services - Endpoint radice e stato del servizio

use crate::core::{AppError, AppState};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{error, instrument};

/// Memoria residente del processo server in MB, None se non leggibile
fn process_memory_mb() -> Option<f64> {
    let pid = Pid::from_u32(std::process::id());
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid)
        .map(|process| process.memory() as f64 / (1024.0 * 1024.0))
        .map(|mb| (mb * 100.0).round() / 100.0)
}

pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "Marketplace API is running",
        "timestamp": Utc::now(),
        "environment": state.app_env,
        "connectedClients": state.users_online.online_count(),
    }))
}

#[instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let database_ok = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            error!("Health check query failed: {:?}", e);
            false
        }
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok((
        status,
        Json(json!({
            "status": if database_ok { "ok" } else { "degraded" },
            "database": if database_ok { "connected" } else { "unreachable" },
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "memory_mb": process_memory_mb(),
            "timestamp": Utc::now(),
        })),
    ))
}
