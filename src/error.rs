//! Error types for loading questions and driving quiz sessions.

use thiserror::Error;
use uuid::Uuid;

/// Ways the remote question source can fail. All of them end in fallback
/// loading; none escapes the loader.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
  #[error("network response was not ok: {status} {status_text}")]
  HttpStatus { status: u16, status_text: String },
  #[error("request to question source failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("question source is rate limiting requests (429)")]
  RateLimited,
  #[error("question source returned a malformed body: {0}")]
  MalformedBody(String),
  #[error("no questions found or invalid response code: {code}")]
  InvalidResponse { code: i64 },
}

impl LoadError {
  /// Coarse kind, used as a log field.
  pub fn kind(&self) -> &'static str {
    match self {
      LoadError::HttpStatus { .. } | LoadError::Transport(_) => "network",
      LoadError::RateLimited => "rate_limited",
      LoadError::MalformedBody(_) | LoadError::InvalidResponse { .. } => "invalid_response",
    }
  }

  /// Rate limiting is informational: fallback kicks in but nothing is reported as a failure.
  pub fn is_informational(&self) -> bool {
    matches!(self, LoadError::RateLimited)
  }
}

/// Errors surfaced to quiz clients (HTTP or WebSocket).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
  #[error("unknown session: {0}")]
  UnknownSession(Uuid),
  #[error("no quiz in progress")]
  NotStarted,
  #[error("no questions available")]
  NoQuestions,
  #[error("questions are still loading")]
  StillLoading,
}

#[cfg(test)]
mod tests {
  use super::LoadError;

  #[test]
  fn messages_carry_status_and_code() {
    let e = LoadError::HttpStatus { status: 503, status_text: "Service Unavailable".into() };
    assert_eq!(e.to_string(), "network response was not ok: 503 Service Unavailable");
    assert_eq!(e.kind(), "network");

    let e = LoadError::InvalidResponse { code: 1 };
    assert_eq!(e.to_string(), "no questions found or invalid response code: 1");
    assert_eq!(e.kind(), "invalid_response");
  }

  #[test]
  fn only_rate_limit_is_informational() {
    assert!(LoadError::RateLimited.is_informational());
    assert!(!LoadError::MalformedBody("x".into()).is_informational());
    assert!(!LoadError::InvalidResponse { code: 2 }.is_informational());
  }
}
