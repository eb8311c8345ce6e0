//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::SessionError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for SessionError {
  fn into_response(self) -> Response {
    let status = match &self {
      SessionError::UnknownSession(_) => StatusCode::NOT_FOUND,
      SessionError::NotStarted => StatusCode::CONFLICT,
      SessionError::NoQuestions | SessionError::StillLoading => StatusCode::SERVICE_UNAVAILABLE,
    };
    warn!(target: "session", %status, error = %self, "Request rejected");
    (status, Json(ErrorOut { message: self.to_string() })).into_response()
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(to_status_out(&logic::load_status(&state)))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_reload(
  State(state): State<Arc<AppState>>,
  body: Option<Json<ReloadIn>>,
) -> impl IntoResponse {
  let body = body.map(|Json(b)| b).unwrap_or_default();
  let status = logic::reload_questions(&state, body.target).await;
  info!(target: "loader", using_fallback = status.using_fallback, total = status.questions.len(), "HTTP reload finished");
  Json(to_status_out(&status))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_session(State(state): State<Arc<AppState>>) -> Result<Json<SessionOut>, SessionError> {
  let (session_id, quiz) = logic::start_session(&state).await?;
  Ok(Json(SessionOut { session_id, quiz }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<crate::progress::QuizView>, SessionError> {
  Ok(Json(logic::session_view(&state, id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SelectIn>,
) -> Result<Json<AnswerOut>, SessionError> {
  let (outcome, quiz) = logic::select_option(&state, id, &body.option).await?;
  Ok(Json(AnswerOut { outcome, quiz }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_advance(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AdvanceOut>, SessionError> {
  let (outcome, quiz) = logic::advance(&state, id).await?;
  Ok(Json(AdvanceOut { outcome, quiz }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_restart(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<crate::progress::QuizView>, SessionError> {
  Ok(Json(logic::restart(&state, id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, SessionError> {
  logic::end_session(&state, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
