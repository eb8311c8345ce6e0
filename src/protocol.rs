//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::loader::LoadStatus;
use crate::progress::{AdvanceOutcome, QuizView, SelectOutcome};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Status,
    Start,
    SelectOption { option: String },
    Advance,
    Restart,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Status { status: StatusOut },
    Quiz { quiz: QuizView },
    AnswerResult { outcome: SelectOutcome, quiz: QuizView },
    AdvanceResult { outcome: AdvanceOutcome, quiz: QuizView },
    Error { message: String },
}

/// Loader status as exposed to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOut {
    pub loading: bool,
    pub error: Option<String>,
    pub failure: Option<String>,
    pub using_fallback: bool,
    pub total_questions: usize,
    pub generation: u64,
}

pub fn to_status_out(s: &LoadStatus) -> StatusOut {
    StatusOut {
        loading: s.loading,
        error: s.error.clone(),
        failure: s.failure.clone(),
        using_fallback: s.using_fallback,
        total_questions: s.questions.len(),
        generation: s.generation,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct ReloadIn {
    /// Fetch target; omitted means the configured one, empty means fallback only.
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectIn {
    pub option: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: Uuid,
    pub quiz: QuizView,
}

#[derive(Serialize)]
pub struct AnswerOut {
    pub outcome: SelectOutcome,
    pub quiz: QuizView,
}

#[derive(Serialize)]
pub struct AdvanceOut {
    pub outcome: AdvanceOutcome,
    pub quiz: QuizView,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
