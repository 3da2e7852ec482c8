//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic; the identity provider upstream has already authenticated the
//! caller and passes the opaque user id in the `x-user-id` header.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  Json,
};
use tracing::{info, instrument};

use crate::error::EngineError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorOut>);

fn user_id(headers: &HeaderMap) -> Result<String, ApiError> {
  headers
    .get("x-user-id")
    .and_then(|v| v.to_str().ok())
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .ok_or_else(|| {
      (
        StatusCode::UNAUTHORIZED,
        Json(ErrorOut { error: "missing x-user-id header".into() }),
      )
    })
}

fn engine_error(e: EngineError) -> ApiError {
  let status = if e.is_retryable() {
    StatusCode::SERVICE_UNAVAILABLE
  } else {
    match &e {
      EngineError::ChallengeAlreadyResolved => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  };
  (status, Json(ErrorOut { error: e.to_string() }))
}

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_daily(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<DailyStatusOut>, ApiError> {
  let user = user_id(&headers)?;
  let today = state.clock.today();
  let out = logic::get_todays_challenge(&state, &user, today)
    .await
    .map_err(engine_error)?;
  info!(target: "challenge", %user, date = %today, attempts_used = out.attempts_used, "HTTP daily challenge served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, headers, body))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<SubmitIn>,
) -> Result<Json<SubmitOut>, ApiError> {
  let user = user_id(&headers)?;
  let today = state.clock.today();
  let out = logic::submit_answer(&state, &user, today, body.answer_data, body.time_taken_seconds)
    .await
    .map_err(engine_error)?;
  info!(target: "challenge", %user, date = %today, correct = out.is_correct, state = ?out.state, "HTTP submit_answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<HistoryItemOut>>, ApiError> {
  let user = user_id(&headers)?;
  let today = state.clock.today();
  let out = logic::get_history(&state, &user, today).await.map_err(engine_error)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_get_stats(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<StatsOut>, ApiError> {
  let user = user_id(&headers)?;
  let out = logic::get_stats(&state, &user).await.map_err(engine_error)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_countries(State(state): State<Arc<AppState>>) -> Json<Vec<CountryListOut>> {
  Json(logic::list_countries(&state))
}

#[instrument(level = "info", skip(state), fields(%code))]
pub async fn http_get_country(
  State(state): State<Arc<AppState>>,
  Path(code): Path<String>,
) -> Result<Json<CountryDetailOut>, ApiError> {
  logic::get_country(&state, &code).map(Json).ok_or_else(|| {
    (
      StatusCode::NOT_FOUND,
      Json(ErrorOut { error: format!("unknown country code: {}", code) }),
    )
  })
}
