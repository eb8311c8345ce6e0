//! WebSocket upgrade + message loop. Each connection owns one private quiz
//! engine; client messages are parsed as JSON and answered with a single JSON
//! message each.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::SessionError;
use crate::logic;
use crate::progress::QuizEngine;
use crate::protocol::{to_status_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "trivia_quiz", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "trivia_quiz", "WebSocket connected");
  let mut engine: Option<QuizEngine> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "trivia_quiz", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut engine).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "trivia_quiz", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "trivia_quiz", "WebSocket disconnected");
}

fn not_started() -> ServerWsMessage {
  ServerWsMessage::Error { message: SessionError::NotStarted.to_string() }
}

async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, engine: &mut Option<QuizEngine>) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Status => ServerWsMessage::Status { status: to_status_out(&logic::load_status(state)) },

    ClientWsMessage::Start => match state.ready_questions().await {
      Ok(questions) => {
        let fresh = QuizEngine::new(questions);
        let quiz = fresh.view();
        *engine = Some(fresh);
        info!(target: "session", total = quiz.total_questions, "WS quiz started");
        ServerWsMessage::Quiz { quiz }
      }
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::SelectOption { option } => match engine.as_mut() {
      Some(e) => {
        let outcome = e.select_option(&option);
        ServerWsMessage::AnswerResult { outcome, quiz: e.view() }
      }
      None => not_started(),
    },

    ClientWsMessage::Advance => match engine.as_mut() {
      Some(e) => {
        let outcome = e.advance();
        ServerWsMessage::AdvanceResult { outcome, quiz: e.view() }
      }
      None => not_started(),
    },

    ClientWsMessage::Restart => match engine.as_mut() {
      Some(e) => {
        e.restart();
        ServerWsMessage::Quiz { quiz: e.view() }
      }
      None => not_started(),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::QuizConfig;
  use crate::loader::{QuestionSource, QuizLoader};
  use crate::progress::{AdvanceOutcome, SelectOutcome};
  use crate::seeds::fallback_questions;

  async fn ready_state() -> AppState {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let loader = QuizLoader::new(QuestionSource::with_client(client), fallback_questions(), Some(3));
    let state = AppState::with_loader(QuizConfig::default(), loader);
    logic::reload_questions(&state, None).await;
    state
  }

  #[tokio::test]
  async fn commands_before_start_are_rejected() {
    let state = ready_state().await;
    let mut engine = None;
    let reply = handle_client_ws(ClientWsMessage::Advance, &state, &mut engine).await;
    assert!(matches!(reply, ServerWsMessage::Error { message } if message == "no quiz in progress"));
  }

  #[tokio::test]
  async fn connection_plays_its_own_quiz() {
    let state = ready_state().await;
    let mut engine = None;

    let quiz = match handle_client_ws(ClientWsMessage::Start, &state, &mut engine).await {
      ServerWsMessage::Quiz { quiz } => quiz,
      other => panic!("unexpected reply: {other:?}"),
    };
    let answer = quiz.current_question.unwrap().correct_answer;

    match handle_client_ws(ClientWsMessage::SelectOption { option: answer }, &state, &mut engine).await {
      ServerWsMessage::AnswerResult { outcome, quiz } => {
        assert_eq!(outcome, SelectOutcome::Correct);
        assert_eq!(quiz.score, 1);
      }
      other => panic!("unexpected reply: {other:?}"),
    }
    match handle_client_ws(ClientWsMessage::Advance, &state, &mut engine).await {
      ServerWsMessage::AdvanceResult { outcome, .. } => assert_eq!(outcome, AdvanceOutcome::Moved { index: 1 }),
      other => panic!("unexpected reply: {other:?}"),
    }
    match handle_client_ws(ClientWsMessage::Restart, &state, &mut engine).await {
      ServerWsMessage::Quiz { quiz } => assert_eq!((quiz.current_question_index, quiz.score), (0, 0)),
      other => panic!("unexpected reply: {other:?}"),
    }
    // Connection-private engines never show up in the shared store.
    assert!(state.sessions.read().await.is_empty());
  }

  #[test]
  fn client_messages_parse_from_tagged_json() {
    let m: ClientWsMessage = serde_json::from_str(r#"{"type":"select_option","option":"Parlor"}"#).unwrap();
    assert!(matches!(m, ClientWsMessage::SelectOption { option } if option == "Parlor"));
    let m: ClientWsMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
    assert!(matches!(m, ClientWsMessage::Start));
  }
}
