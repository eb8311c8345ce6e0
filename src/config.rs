//! Loading quiz configuration (question source + optional fallback bank) from TOML,
//! with a few environment overrides on top.
//!
//! See `QuizConfig` and `SourceCfg` for expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::RawQuestion;

pub const DEFAULT_SOURCE_URL: &str =
  "https://opentdb.com/api.php?amount=50&category=9&difficulty=hard&type=multiple";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub source: SourceCfg,
  #[serde(default)]
  pub sessions: SessionCfg,
  /// Fixed seed for option shuffling; entropy-seeded when absent.
  #[serde(default)]
  pub shuffle_seed: Option<u64>,
  /// Replaces the built-in fallback questions when non-empty.
  #[serde(default)]
  pub questions: Vec<RawQuestion>,
}

/// Where remote questions come from. `enabled = false` means "fallback only".
#[derive(Clone, Debug, Deserialize)]
pub struct SourceCfg {
  #[serde(default = "default_url")]
  pub url: String,
  #[serde(default)]
  pub enabled: bool,
  #[serde(default = "default_timeout_secs")]
  pub fetch_timeout_secs: u64,
}

fn default_url() -> String { DEFAULT_SOURCE_URL.into() }
fn default_timeout_secs() -> u64 { 10 }

impl Default for SourceCfg {
  fn default() -> Self {
    Self { url: default_url(), enabled: false, fetch_timeout_secs: default_timeout_secs() }
  }
}

/// Bounds on the in-memory session store.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionCfg {
  /// Sessions untouched for this long are dropped.
  #[serde(default = "default_idle_ttl_secs")]
  pub idle_ttl_secs: u64,
  /// Least recently used sessions are evicted beyond this count.
  #[serde(default = "default_max_sessions")]
  pub max_sessions: usize,
}

fn default_idle_ttl_secs() -> u64 { 30 * 60 }
fn default_max_sessions() -> usize { 10_000 }

impl Default for SessionCfg {
  fn default() -> Self {
    Self { idle_ttl_secs: default_idle_ttl_secs(), max_sessions: default_max_sessions() }
  }
}

impl SessionCfg {
  pub fn idle_ttl(&self) -> Duration {
    Duration::from_secs(self.idle_ttl_secs)
  }

  pub fn capacity(&self) -> usize {
    self.max_sessions.max(1)
  }
}

impl SourceCfg {
  /// The fetch target the loader receives: empty when the remote source is off.
  pub fn target(&self) -> String {
    if self.enabled { self.url.trim().to_string() } else { String::new() }
  }

  pub fn fetch_timeout(&self) -> Duration {
    Duration::from_secs(self.fetch_timeout_secs.max(1))
  }
}

impl QuizConfig {
  pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(s)
  }

  /// Apply QUIZ_* overrides through `lookup` (normally `std::env::var`).
  pub fn apply_overrides<F>(&mut self, lookup: F)
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(url) = lookup("QUIZ_SOURCE_URL") {
      self.source.url = url;
    }
    if let Some(flag) = lookup("QUIZ_USE_REMOTE") {
      self.source.enabled = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
    if let Some(secs) = lookup("QUIZ_FETCH_TIMEOUT_SECS") {
      match secs.trim().parse::<u64>() {
        Ok(v) => self.source.fetch_timeout_secs = v,
        Err(e) => warn!(target: "trivia_quiz", value = %secs, error = %e, "Ignoring invalid QUIZ_FETCH_TIMEOUT_SECS"),
      }
    }
    if let Some(secs) = lookup("QUIZ_SESSION_TTL_SECS") {
      match secs.trim().parse::<u64>() {
        Ok(v) => self.sessions.idle_ttl_secs = v,
        Err(e) => warn!(target: "trivia_quiz", value = %secs, error = %e, "Ignoring invalid QUIZ_SESSION_TTL_SECS"),
      }
    }
    if let Some(max) = lookup("QUIZ_MAX_SESSIONS") {
      match max.trim().parse::<usize>() {
        Ok(v) => self.sessions.max_sessions = v,
        Err(e) => warn!(target: "trivia_quiz", value = %max, error = %e, "Ignoring invalid QUIZ_MAX_SESSIONS"),
      }
    }
    if let Some(seed) = lookup("QUIZ_SHUFFLE_SEED") {
      match seed.trim().parse::<u64>() {
        Ok(v) => self.shuffle_seed = Some(v),
        Err(e) => warn!(target: "trivia_quiz", value = %seed, error = %e, "Ignoring invalid QUIZ_SHUFFLE_SEED"),
      }
    }
  }
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match QuizConfig::from_toml_str(&s) {
      Ok(cfg) => {
        info!(target: "trivia_quiz", %path, bank = cfg.questions.len(), "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "trivia_quiz", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "trivia_quiz", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// TOML file (if any) plus environment overrides.
pub fn resolve_config() -> QuizConfig {
  let mut cfg = load_quiz_config_from_env().unwrap_or_default();
  cfg.apply_overrides(|key| std::env::var(key).ok());
  cfg
}
