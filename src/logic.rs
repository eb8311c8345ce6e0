//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Reloading questions and reporting loader status
//!   - Creating sessions from the latest loaded questions
//!   - Driving a stored session (select / advance / restart) and ending it

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::SessionError;
use crate::loader::LoadStatus;
use crate::progress::{AdvanceOutcome, QuizView, SelectOutcome};
use crate::state::AppState;

/// Restart loading (configured target when `target` is None) and wait for the result.
#[instrument(level = "info", skip_all, fields(configured = target.is_none()))]
pub async fn reload_questions(state: &AppState, target: Option<String>) -> LoadStatus {
  let target = target.unwrap_or_else(|| state.config.source.target());
  let generation = state.loader.reload(target);
  info!(target: "loader", generation, "Reload requested");
  match tokio::time::timeout(state.ready_timeout(), state.loader.wait_ready()).await {
    Ok(status) => status,
    Err(_) => state.loader.status(),
  }
}

pub fn load_status(state: &AppState) -> LoadStatus {
  state.loader.status()
}

#[instrument(level = "info", skip(state))]
pub async fn start_session(state: &AppState) -> Result<(Uuid, QuizView), SessionError> {
  let questions = state.ready_questions().await?;
  let (id, view) = state.insert_session(questions).await;
  info!(target: "session", session_id = %id, total = view.total_questions, "Session started");
  Ok((id, view))
}

pub async fn session_view(state: &AppState, id: Uuid) -> Result<QuizView, SessionError> {
  state.with_session(id, |engine| engine.view()).await
}

#[instrument(level = "info", skip(state, option), fields(option_len = option.len()))]
pub async fn select_option(state: &AppState, id: Uuid, option: &str) -> Result<(SelectOutcome, QuizView), SessionError> {
  let (outcome, view) = state
    .with_session(id, |engine| {
      let outcome = engine.select_option(option);
      (outcome, engine.view())
    })
    .await?;
  info!(target: "session", session_id = %id, ?outcome, score = view.score, "Option selected");
  Ok((outcome, view))
}

#[instrument(level = "info", skip(state))]
pub async fn advance(state: &AppState, id: Uuid) -> Result<(AdvanceOutcome, QuizView), SessionError> {
  let (outcome, view) = state
    .with_session(id, |engine| {
      let outcome = engine.advance();
      (outcome, engine.view())
    })
    .await?;
  if let AdvanceOutcome::Completed { score, total, rating } = outcome {
    info!(target: "session", session_id = %id, score, total, ?rating, "Quiz completed");
  }
  Ok((outcome, view))
}

#[instrument(level = "info", skip(state))]
pub async fn restart(state: &AppState, id: Uuid) -> Result<QuizView, SessionError> {
  let view = state
    .with_session(id, |engine| {
      engine.restart();
      engine.view()
    })
    .await?;
  info!(target: "session", session_id = %id, "Session restarted");
  Ok(view)
}

#[instrument(level = "info", skip(state))]
pub async fn end_session(state: &AppState, id: Uuid) -> Result<(), SessionError> {
  state.remove_session(id).await?;
  info!(target: "session", session_id = %id, "Session ended");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::QuizConfig;
  use crate::loader::{QuestionSource, QuizLoader};
  use crate::progress::{Phase, Rating};
  use crate::seeds::fallback_questions;

  fn state_with_bank(bank: Vec<crate::domain::RawQuestion>) -> AppState {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let loader = QuizLoader::new(QuestionSource::with_client(client), bank, Some(5));
    AppState::with_loader(QuizConfig::default(), loader)
  }

  #[tokio::test]
  async fn full_quiz_through_shared_logic() {
    let state = state_with_bank(fallback_questions());
    let status = reload_questions(&state, Some(String::new())).await;
    assert!(status.using_fallback);

    let (id, view) = start_session(&state).await.unwrap();
    assert_eq!(view.total_questions, 10);

    let mut expected_score = 0;
    for i in 0..10 {
      let current = session_view(&state, id).await.unwrap().current_question.unwrap();
      let pick = if i % 2 == 0 { current.correct_answer.clone() } else { "definitely wrong".to_string() };
      let (outcome, view) = select_option(&state, id, &pick).await.unwrap();
      if i % 2 == 0 {
        expected_score += 1;
        assert_eq!(outcome, SelectOutcome::Correct);
      }
      assert_eq!(view.score, expected_score);
      let (outcome, _) = advance(&state, id).await.unwrap();
      if i == 9 {
        assert_eq!(outcome, AdvanceOutcome::Completed { score: 5, total: 10, rating: Rating::GoodEffort });
      }
    }

    let done = session_view(&state, id).await.unwrap();
    assert!(done.complete);
    assert_eq!(done.score, 5);

    let fresh = restart(&state, id).await.unwrap();
    assert!(!fresh.complete);
    assert_eq!(fresh.score, 0);
    assert_eq!(fresh.current_question_index, 0);
    let phase = state.with_session(id, |e| e.phase()).await.unwrap();
    assert_eq!(phase, Phase::Active);
  }

  #[tokio::test]
  async fn unknown_session_is_an_error() {
    let state = state_with_bank(fallback_questions());
    let id = Uuid::new_v4();
    assert!(matches!(session_view(&state, id).await, Err(SessionError::UnknownSession(x)) if x == id));
    assert!(advance(&state, id).await.is_err());
    assert!(end_session(&state, id).await.is_err());
  }

  #[tokio::test]
  async fn ended_session_cannot_be_driven() {
    let state = state_with_bank(fallback_questions());
    reload_questions(&state, None).await;
    let (id, _) = start_session(&state).await.unwrap();
    end_session(&state, id).await.unwrap();
    assert!(matches!(session_view(&state, id).await, Err(SessionError::UnknownSession(x)) if x == id));
    assert!(state.sessions.read().await.is_empty());
  }

  #[tokio::test]
  async fn empty_bank_refuses_sessions() {
    let state = state_with_bank(Vec::new());
    reload_questions(&state, Some(String::new())).await;
    assert!(matches!(start_session(&state).await, Err(SessionError::NoQuestions)));
  }

  #[tokio::test]
  async fn restart_keeps_the_same_question_order() {
    let state = state_with_bank(fallback_questions());
    reload_questions(&state, None).await;
    let (id, first) = start_session(&state).await.unwrap();
    let answer = first.current_question.clone().unwrap().correct_answer;
    select_option(&state, id, &answer).await.unwrap();
    advance(&state, id).await.unwrap();
    let again = restart(&state, id).await.unwrap();
    assert_eq!(again.current_question, first.current_question);
  }
}
