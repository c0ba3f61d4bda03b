//! HTTP route handlers for the coordinator API.
//!
//! Thin translation between HTTP and the engines — no domain logic here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::battles::{BattleInput, BattleUpdate};
use crate::db::pool;
use crate::db::store::SummaryStore;
use crate::error::CoordinatorError;

use super::server::AppState;

/// Build all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/clans/{clan_id}/battles",
            get(list_battles).post(create_battle),
        )
        .route(
            "/api/clans/{clan_id}/battles/{battle_id}",
            get(get_battle).put(update_battle).delete(delete_battle),
        )
        .route(
            "/api/clans/{clan_id}/performance/month/{month_id}",
            get(monthly_performance),
        )
        .route(
            "/api/clans/{clan_id}/performance/year/{year_id}",
            get(yearly_performance),
        )
        .route("/api/schedule", get(schedule_info))
        .route(
            "/api/schedule/next",
            get(next_battle_date).put(update_next_battle_date),
        )
        .route("/api/schedule/battles", post(manual_battle))
        .route("/health", get(health))
}

fn error_response(e: CoordinatorError) -> Response {
    let status = match &e {
        CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
        CoordinatorError::NotFound(_) => StatusCode::NOT_FOUND,
        CoordinatorError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

/// POST /api/clans/{clan_id}/battles — record a clan's battle results.
async fn create_battle(
    State(state): State<AppState>,
    Path(clan_id): Path<String>,
    Json(input): Json<BattleInput>,
) -> Response {
    match state.engine.create_battle(&clan_id, input).await {
        Ok(detail) => (StatusCode::CREATED, Json(json!({ "battle": detail }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/clans/{clan_id}/battles — all battles for a clan.
async fn list_battles(State(state): State<AppState>, Path(clan_id): Path<String>) -> Response {
    match state.engine.get_battles(&clan_id).await {
        Ok(battles) => Json(json!({ "battles": battles })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/clans/{clan_id}/battles/{battle_id} — one battle with stat rows.
async fn get_battle(
    State(state): State<AppState>,
    Path((clan_id, battle_id)): Path<(String, String)>,
) -> Response {
    match state.engine.get_battle(&clan_id, &battle_id).await {
        Ok(detail) => Json(json!({ "battle": detail })).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /api/clans/{clan_id}/battles/{battle_id} — merge-and-recompute update.
async fn update_battle(
    State(state): State<AppState>,
    Path((clan_id, battle_id)): Path<(String, String)>,
    Json(patch): Json<BattleUpdate>,
) -> Response {
    match state.engine.update_battle(&clan_id, &battle_id, patch).await {
        Ok(detail) => Json(json!({ "battle": detail })).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/clans/{clan_id}/battles/{battle_id}.
async fn delete_battle(
    State(state): State<AppState>,
    Path((clan_id, battle_id)): Path<(String, String)>,
) -> Response {
    match state.engine.delete_battle(&clan_id, &battle_id).await {
        Ok(()) => Json(json!({ "deleted": true })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/clans/{clan_id}/performance/month/{month_id}.
async fn monthly_performance(
    State(state): State<AppState>,
    Path((clan_id, month_id)): Path<(String, String)>,
) -> Response {
    match state.store.get_monthly_performance(&clan_id, &month_id).await {
        Ok(Some(row)) => Json(json!({ "performance": row })).into_response(),
        Ok(None) => error_response(CoordinatorError::not_found(format!(
            "no monthly performance for clan {clan_id} month {month_id}"
        ))),
        Err(e) => error_response(e),
    }
}

/// GET /api/clans/{clan_id}/performance/year/{year_id}.
async fn yearly_performance(
    State(state): State<AppState>,
    Path((clan_id, year_id)): Path<(String, String)>,
) -> Response {
    match state.store.get_yearly_performance(&clan_id, &year_id).await {
        Ok(Some(row)) => Json(json!({ "performance": row })).into_response(),
        Ok(None) => error_response(CoordinatorError::not_found(format!(
            "no yearly performance for clan {clan_id} year {year_id}"
        ))),
        Err(e) => error_response(e),
    }
}

/// GET /api/schedule — setting plus recent master battles.
async fn schedule_info(State(state): State<AppState>) -> Response {
    match state.scheduler.schedule_info().await {
        Ok(info) => Json(json!({ "schedule": info })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/schedule/next.
async fn next_battle_date(State(state): State<AppState>) -> Response {
    match state.scheduler.next_battle_date().await {
        Ok(next) => Json(json!({ "next_battle_start": next })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleUpdateRequest {
    next_battle_start: DateTime<Utc>,
    scheduler_enabled: bool,
}

/// PUT /api/schedule/next — manual override of the schedule state.
async fn update_next_battle_date(
    State(state): State<AppState>,
    Json(req): Json<ScheduleUpdateRequest>,
) -> Response {
    match state
        .scheduler
        .update_next_battle_date(req.next_battle_start, req.scheduler_enabled)
        .await
    {
        Ok(()) => Json(json!({ "updated": true })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ManualBattleRequest {
    /// Game-Time calendar date of the battle.
    date: NaiveDate,
    /// Acting admin, supplied by the auth layer in front of this service.
    actor: String,
}

/// POST /api/schedule/battles — create a window outside the cadence.
async fn manual_battle(
    State(state): State<AppState>,
    Json(req): Json<ManualBattleRequest>,
) -> Response {
    match state
        .scheduler
        .manually_create_battle(req.date, &req.actor)
        .await
    {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(json!({ "battle": outcome.battle, "created": outcome.created })))
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /health — simple health check.
async fn health(State(state): State<AppState>) -> Response {
    match pool::health_check(&state.db).await {
        Ok(()) => "ok".into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
