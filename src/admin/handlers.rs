use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::CircuitStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breakers: usize,
    pub checks: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        breakers: state.breakers.len(),
        checks: state.monitor.check_names().len(),
    })
}

pub async fn list_breakers(State(state): State<AppState>) -> Json<Vec<CircuitStats>> {
    Json(state.breakers.values().map(|b| b.stats()).collect())
}

pub async fn get_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CircuitStats>, StatusCode> {
    state
        .breakers
        .get(&name)
        .map(|b| Json(b.stats()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CircuitStats>, StatusCode> {
    let breaker = state.breakers.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    breaker.reset();
    tracing::info!(breaker = %name, "Circuit breaker reset via admin API");
    Ok(Json(breaker.stats()))
}
