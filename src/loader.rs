//! Question loading: one best-effort fetch from the remote source, with the
//! built-in (or configured) bank as the recovery path.
//!
//! `QuizLoader` owns:
//!   - the HTTP client (with a hard request timeout)
//!   - the fallback bank
//!   - the shuffle RNG (seedable, so option order is reproducible in tests)
//!   - the published `LoadStatus`, behind a `tokio::sync::watch` channel
//!
//! Every reload bumps the status generation and aborts the previous task.
//! A task only publishes if its generation is still the current one, so a
//! superseded fetch can never overwrite a newer result.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::StatusCode;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::QuizConfig;
use crate::domain::{normalize_all, NormalizedQuestion, RawQuestion, SourceResponse};
use crate::error::LoadError;
use crate::seeds::fallback_questions;
use crate::util::trunc_for_log;

pub const FALLBACK_NOTICE: &str = "Using local quiz data due to API rate limit or error. Try again later.";

/// What the presentation layer sees of the loader.
#[derive(Clone, Debug)]
pub struct LoadStatus {
  pub questions: Arc<Vec<NormalizedQuestion>>,
  pub loading: bool,
  /// User-facing, non-fatal notice (set whenever fallback data is in use).
  pub error: Option<String>,
  /// Underlying fetch failure, if any, kept for observability.
  pub failure: Option<String>,
  pub using_fallback: bool,
  pub generation: u64,
}

impl LoadStatus {
  fn idle() -> Self {
    Self {
      questions: Arc::new(Vec::new()),
      loading: false,
      error: None,
      failure: None,
      using_fallback: false,
      generation: 0,
    }
  }

  fn loading(generation: u64) -> Self {
    Self { loading: true, generation, ..Self::idle() }
  }

  fn remote(questions: Vec<NormalizedQuestion>) -> Self {
    Self { questions: Arc::new(questions), ..Self::idle() }
  }
}

/// Thin wrapper around the HTTP client talking to the question source.
#[derive(Clone)]
pub struct QuestionSource {
  client: reqwest::Client,
}

impl QuestionSource {
  pub fn new(timeout: Duration) -> Result<Self, LoadError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent("trivia-quiz/0.1")
      .build()?;
    Ok(Self::with_client(client))
  }

  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }

  /// Single GET against `url`. Returns the raw `results` on success.
  #[instrument(level = "debug", skip(self))]
  pub async fn fetch(&self, url: &str) -> Result<Vec<RawQuestion>, LoadError> {
    let res = self.client.get(url).send().await?;
    let status = res.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(LoadError::RateLimited);
    }
    if !status.is_success() {
      return Err(LoadError::HttpStatus {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
      });
    }

    let body = res.bytes().await?;
    let parsed: SourceResponse = serde_json::from_slice(&body).map_err(|e| {
      debug!(target: "loader", body = %trunc_for_log(&String::from_utf8_lossy(&body), 200), "Unparseable source body");
      LoadError::MalformedBody(e.to_string())
    })?;

    if parsed.response_code != 0 || parsed.results.is_empty() {
      return Err(LoadError::InvalidResponse { code: parsed.response_code });
    }
    Ok(parsed.results)
  }
}

#[derive(Clone)]
pub struct QuizLoader {
  inner: Arc<Inner>,
}

struct Inner {
  source: QuestionSource,
  fallback: Vec<RawQuestion>,
  rng: Mutex<StdRng>,
  status: watch::Sender<LoadStatus>,
  in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl QuizLoader {
  pub fn new(source: QuestionSource, fallback: Vec<RawQuestion>, shuffle_seed: Option<u64>) -> Self {
    let rng = match shuffle_seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    let (status, _) = watch::channel(LoadStatus::idle());
    Self {
      inner: Arc::new(Inner {
        source,
        fallback,
        rng: Mutex::new(rng),
        status,
        in_flight: Mutex::new(None),
      }),
    }
  }

  /// Build from config: HTTP client with the configured timeout, and the
  /// configured bank (built-in questions when the bank is empty).
  pub fn from_config(cfg: &QuizConfig) -> Result<Self, LoadError> {
    let source = QuestionSource::new(cfg.source.fetch_timeout())?;
    let fallback = if cfg.questions.is_empty() { fallback_questions() } else { cfg.questions.clone() };
    info!(target: "loader", bank = fallback.len(), seeded = cfg.shuffle_seed.is_some(), "Question loader ready");
    Ok(Self::new(source, fallback, cfg.shuffle_seed))
  }

  /// Snapshot of the latest published status.
  pub fn status(&self) -> LoadStatus {
    self.inner.status.borrow().clone()
  }

  /// Resolves once the current load (if any) has published its result.
  pub async fn wait_ready(&self) -> LoadStatus {
    let mut rx = self.inner.status.subscribe();
    let ready = rx.wait_for(|s| !s.loading).await.map(|s| s.clone());
    match ready {
      Ok(s) => s,
      Err(_) => self.status(),
    }
  }

  /// Start a fresh load for `target`, superseding any load still in flight.
  /// Returns the generation of the new load.
  pub fn reload(&self, target: impl Into<String>) -> u64 {
    let target = target.into();
    let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

    let mut generation = 0;
    self.inner.status.send_modify(|s| {
      generation = s.generation + 1;
      *s = LoadStatus::loading(generation);
    });

    let this = self.clone();
    let handle = tokio::spawn(async move {
      let status = this.load(&target).await;
      this.publish(generation, status);
    });

    if let Some(previous) = in_flight.replace(handle) {
      if !previous.is_finished() {
        debug!(target: "loader", superseded_by = generation, "Aborting superseded load");
        previous.abort();
      }
    }
    generation
  }

  fn publish(&self, generation: u64, status: LoadStatus) -> bool {
    let published = self.inner.status.send_if_modified(|current| {
      if current.generation != generation {
        return false;
      }
      *current = LoadStatus { generation, loading: false, ..status };
      true
    });
    if !published {
      debug!(target: "loader", generation, "Discarding result of superseded load");
    }
    published
  }

  /// Run the full load policy once and return the resulting status
  /// (not published; see `reload`).
  #[instrument(level = "info", skip_all, fields(url = %target))]
  pub async fn load(&self, target: &str) -> LoadStatus {
    let target = target.trim();
    if target.is_empty() {
      info!(target: "loader", "No question source configured; using fallback data");
      return self.load_fallback(None);
    }

    match self.inner.source.fetch(target).await {
      Ok(raw) => {
        let questions = self.normalize(&raw);
        info!(target: "loader", count = questions.len(), "Loaded questions from source");
        LoadStatus::remote(questions)
      }
      Err(e) if e.is_informational() => {
        warn!(target: "loader", kind = e.kind(), "Question source rate limited; using fallback data");
        self.load_fallback(None)
      }
      Err(e) => {
        error!(target: "loader", kind = e.kind(), error = %e, "Fetch failed; using fallback data");
        self.load_fallback(Some(format!("Failed to fetch quiz data: {e}")))
      }
    }
  }

  fn load_fallback(&self, failure: Option<String>) -> LoadStatus {
    let questions = self.normalize(&self.inner.fallback);
    if questions.is_empty() {
      warn!(target: "loader", "Fallback bank is empty; no questions available");
    } else {
      info!(target: "loader", count = questions.len(), "Using fallback quiz data");
    }
    LoadStatus {
      questions: Arc::new(questions),
      error: Some(FALLBACK_NOTICE.to_string()),
      failure,
      using_fallback: true,
      ..LoadStatus::idle()
    }
  }

  fn normalize(&self, raw: &[RawQuestion]) -> Vec<NormalizedQuestion> {
    let mut rng = self.inner.rng.lock().unwrap_or_else(PoisonError::into_inner);
    normalize_all(raw, &mut *rng)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{http::StatusCode as HttpStatus, routing::get, Json, Router};
  use serde_json::{json, Value};
  use std::net::SocketAddr;
  use tokio::net::TcpListener;

  fn five_results() -> Value {
    json!({
      "response_code": 0,
      "results": [
        { "question": "Q1 &amp; more", "correct_answer": "A", "incorrect_answers": ["B", "C", "D"], "type": "multiple", "difficulty": "hard", "category": "General Knowledge" },
        { "question": "Q2", "correct_answer": "Caf&eacute;", "incorrect_answers": ["Tea"], "type": "multiple", "difficulty": "easy", "category": "Food" },
        { "question": "Q3 &quot;quoted&quot;", "correct_answer": "x", "incorrect_answers": ["y", "z", "w"], "type": "multiple", "difficulty": "hard", "category": "Misc" },
        { "question": "Q4", "correct_answer": "True", "incorrect_answers": ["False"], "type": "boolean", "difficulty": "medium", "category": "Misc" },
        { "question": "Q5 it&#039;s", "correct_answer": "1", "incorrect_answers": ["2", "3", "4"], "type": "multiple", "difficulty": "hard", "category": "Math" }
      ]
    })
  }

  async fn spawn_source() -> SocketAddr {
    let app = Router::new()
      .route("/ok", get(|| async { Json(five_results()) }))
      .route("/limited", get(|| async { HttpStatus::TOO_MANY_REQUESTS }))
      .route("/down", get(|| async { HttpStatus::SERVICE_UNAVAILABLE }))
      .route("/garbage", get(|| async { "<html>not json</html>" }))
      .route("/empty", get(|| async { Json(json!({ "response_code": 1, "results": [] })) }))
      .route(
        "/slow",
        get(|| async {
          tokio::time::sleep(Duration::from_secs(5)).await;
          Json(five_results())
        }),
      );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    addr
  }

  fn loader(timeout: Duration) -> QuizLoader {
    let client = reqwest::Client::builder().no_proxy().timeout(timeout).build().unwrap();
    QuizLoader::new(QuestionSource::with_client(client), fallback_questions(), Some(11))
  }

  fn assert_fallback(status: &LoadStatus) {
    assert!(!status.loading);
    assert!(status.using_fallback);
    assert_eq!(status.questions.len(), 10);
    assert_eq!(status.error.as_deref(), Some(FALLBACK_NOTICE));
  }

  #[tokio::test]
  async fn empty_target_loads_fallback_without_network() {
    let loader = loader(Duration::from_secs(2));
    let generation = loader.reload("");
    assert_eq!(generation, 1);
    assert!(loader.status().loading);

    let status = loader.wait_ready().await;
    assert_fallback(&status);
    assert!(status.failure.is_none());
    for q in status.questions.iter() {
      assert!(q.options.contains(&q.correct_answer));
      assert!(!q.text.contains("&quot;"));
    }
  }

  #[tokio::test]
  async fn whitespace_target_counts_as_empty() {
    let status = loader(Duration::from_secs(2)).load("   ").await;
    assert_fallback(&status);
  }

  #[tokio::test]
  async fn rate_limit_matches_empty_target_outcome() {
    let addr = spawn_source().await;
    let loader = loader(Duration::from_secs(2));
    let limited = loader.load(&format!("http://{addr}/limited")).await;
    let empty = loader.load("").await;

    assert_fallback(&limited);
    assert_eq!(limited.error, empty.error);
    assert_eq!(limited.failure, empty.failure);
    assert_eq!(limited.using_fallback, empty.using_fallback);
    assert_eq!(limited.questions.len(), empty.questions.len());
  }

  #[tokio::test]
  async fn successful_fetch_yields_normalized_remote_questions() {
    let addr = spawn_source().await;
    let loader = loader(Duration::from_secs(2));
    loader.reload(format!("http://{addr}/ok"));
    let status = loader.wait_ready().await;

    assert!(!status.loading);
    assert!(!status.using_fallback);
    assert!(status.error.is_none());
    assert!(status.failure.is_none());
    assert_eq!(status.questions.len(), 5);
    assert_eq!(status.questions[0].text, "Q1 & more");
    assert_eq!(status.questions[1].correct_answer, "Café");
    assert_eq!(status.questions[1].options.len(), 2);
    assert_eq!(status.questions[4].text, "Q5 it's");
  }

  #[tokio::test]
  async fn http_error_falls_back_and_records_status() {
    let addr = spawn_source().await;
    let status = loader(Duration::from_secs(2)).load(&format!("http://{addr}/down")).await;
    assert_fallback(&status);
    let failure = status.failure.unwrap();
    assert!(failure.contains("503"), "{failure}");
    assert!(failure.contains("Service Unavailable"), "{failure}");
  }

  #[tokio::test]
  async fn malformed_and_empty_bodies_fall_back() {
    let addr = spawn_source().await;
    let loader = loader(Duration::from_secs(2));

    let garbage = loader.load(&format!("http://{addr}/garbage")).await;
    assert_fallback(&garbage);
    assert!(garbage.failure.unwrap().contains("malformed"));

    let empty = loader.load(&format!("http://{addr}/empty")).await;
    assert_fallback(&empty);
    assert!(empty.failure.unwrap().contains("invalid response code: 1"));
  }

  #[tokio::test]
  async fn timeout_and_bad_url_fall_back() {
    let addr = spawn_source().await;
    let loader = loader(Duration::from_millis(200));

    let slow = loader.load(&format!("http://{addr}/slow")).await;
    assert_fallback(&slow);
    assert!(slow.failure.is_some());

    let bad = loader.load("not a url").await;
    assert_fallback(&bad);
    assert!(bad.failure.is_some());
  }

  #[tokio::test]
  async fn source_errors_map_to_kinds() {
    let addr = spawn_source().await;
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let source = QuestionSource::with_client(client);

    let err = source.fetch(&format!("http://{addr}/limited")).await.unwrap_err();
    assert!(matches!(err, LoadError::RateLimited));
    let err = source.fetch(&format!("http://{addr}/down")).await.unwrap_err();
    assert!(matches!(err, LoadError::HttpStatus { status: 503, .. }));
    let err = source.fetch(&format!("http://{addr}/empty")).await.unwrap_err();
    assert!(matches!(err, LoadError::InvalidResponse { code: 1 }));
    let ok = source.fetch(&format!("http://{addr}/ok")).await.unwrap();
    assert_eq!(ok.len(), 5);
  }

  #[tokio::test]
  async fn newer_reload_supersedes_in_flight_fetch() {
    let addr = spawn_source().await;
    let loader = loader(Duration::from_secs(10));

    let first = loader.reload(format!("http://{addr}/slow"));
    let second = loader.reload("");
    assert!(second > first);

    let status = loader.wait_ready().await;
    assert_eq!(status.generation, second);
    assert_fallback(&status);

    // A late result from the first generation must not be accepted.
    let stale = LoadStatus::remote(Vec::new());
    assert!(!loader.publish(first, stale));
    let after = loader.status();
    assert_eq!(after.generation, second);
    assert_eq!(after.questions.len(), 10);
  }

  #[tokio::test]
  async fn empty_bank_is_reported_faithfully() {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let loader = QuizLoader::new(QuestionSource::with_client(client), Vec::new(), Some(1));
    let status = loader.load("").await;
    assert!(status.using_fallback);
    assert!(status.questions.is_empty());
  }
}
