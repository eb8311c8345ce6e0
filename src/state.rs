//! Application state: configuration, the question loader, and the in-memory
//! session store.
//!
//! Each session owns its `QuizEngine` exclusively; engines are only touched
//! under the store's write lock and every engine operation is synchronous.
//! Idle sessions expire after `sessions.idle_ttl_secs`; past
//! `sessions.max_sessions` the least recently used one is evicted.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::QuizConfig;
use crate::domain::NormalizedQuestion;
use crate::error::{LoadError, SessionError};
use crate::loader::QuizLoader;
use crate::progress::{QuizEngine, QuizView};

/// Extra slack on top of the fetch timeout before giving up on a load.
const READY_SLACK: Duration = Duration::from_secs(5);

pub struct SessionEntry {
    engine: QuizEngine,
    last_touched: Instant,
}

impl SessionEntry {
    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_touched) >= ttl
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: QuizConfig,
    pub loader: QuizLoader,
    pub sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl AppState {
    /// Build state from config and kick off the initial load.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: QuizConfig) -> Result<Self, LoadError> {
        let loader = QuizLoader::from_config(&config)?;
        let state = Self::with_loader(config, loader);
        let target = state.config.source.target();
        info!(target: "trivia_quiz", remote = !target.is_empty(), "Starting initial question load");
        state.loader.reload(target);
        Ok(state)
    }

    /// State around an existing loader; no load is started.
    pub fn with_loader(config: QuizConfig, loader: QuizLoader) -> Self {
        Self {
            config,
            loader,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn ready_timeout(&self) -> Duration {
        self.config.source.fetch_timeout() + READY_SLACK
    }

    /// Questions of the latest finished load. Errors when loading takes too
    /// long or produced nothing.
    pub async fn ready_questions(&self) -> Result<Arc<Vec<NormalizedQuestion>>, SessionError> {
        let status = tokio::time::timeout(self.ready_timeout(), self.loader.wait_ready())
            .await
            .map_err(|_| SessionError::StillLoading)?;
        if status.questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        Ok(status.questions)
    }

    #[instrument(level = "debug", skip(self, questions), fields(total = questions.len()))]
    pub async fn insert_session(&self, questions: Arc<Vec<NormalizedQuestion>>) -> (Uuid, QuizView) {
        let id = Uuid::new_v4();
        let engine = QuizEngine::new(questions);
        let view = engine.view();
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions, now);
        sessions.insert(id, SessionEntry { engine, last_touched: now });
        (id, view)
    }

    /// Run `f` against the session's engine under the write lock.
    pub async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut QuizEngine) -> T,
    ) -> Result<T, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id).ok_or(SessionError::UnknownSession(id))?;
        if entry.expired(now, self.config.sessions.idle_ttl()) {
            sessions.remove(&id);
            debug!(target: "session", session_id = %id, "Session expired");
            return Err(SessionError::UnknownSession(id));
        }
        entry.last_touched = now;
        Ok(f(&mut entry.engine))
    }

    pub async fn remove_session(&self, id: Uuid) -> Result<(), SessionError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(SessionError::UnknownSession(id)),
        }
    }

    /// Drop expired sessions, then evict least recently used ones until a new
    /// session fits under the cap.
    fn sweep(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        let ttl = self.config.sessions.idle_ttl();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.expired(now, ttl));

        let capacity = self.config.sessions.capacity();
        while sessions.len() >= capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let dropped = before - sessions.len();
        if dropped > 0 {
            info!(target: "session", dropped, remaining = sessions.len(), "Evicted sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionCfg;
    use crate::loader::QuestionSource;
    use crate::seeds::fallback_questions;

    fn state_with(sessions: SessionCfg) -> AppState {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let loader = QuizLoader::new(QuestionSource::with_client(client), fallback_questions(), Some(1));
        let config = QuizConfig { sessions, ..QuizConfig::default() };
        AppState::with_loader(config, loader)
    }

    fn questions() -> Arc<Vec<NormalizedQuestion>> {
        Arc::new(vec![NormalizedQuestion {
            text: "Q".into(),
            correct_answer: "a".into(),
            options: vec!["a".into(), "b".into()],
            category: None,
            difficulty: None,
        }])
    }

    #[tokio::test(start_paused = true)]
    async fn store_is_capped_and_evicts_least_recently_used() {
        let state = state_with(SessionCfg { idle_ttl_secs: 3600, max_sessions: 2 });
        let (first, _) = state.insert_session(questions()).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let (second, _) = state.insert_session(questions()).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        state.with_session(first, |e| e.view()).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        let (third, _) = state.insert_session(questions()).await;

        assert_eq!(state.sessions.read().await.len(), 2);
        assert!(state.with_session(first, |_| ()).await.is_ok());
        assert!(state.with_session(third, |_| ()).await.is_ok());
        assert!(matches!(
            state.with_session(second, |_| ()).await,
            Err(SessionError::UnknownSession(x)) if x == second
        ));

        for _ in 0..1000 {
            state.insert_session(questions()).await;
        }
        assert_eq!(state.sessions.read().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire() {
        let state = state_with(SessionCfg { idle_ttl_secs: 60, max_sessions: 100 });
        let (idle, _) = state.insert_session(questions()).await;
        let (busy, _) = state.insert_session(questions()).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        state.with_session(busy, |_| ()).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert!(matches!(state.with_session(idle, |_| ()).await, Err(SessionError::UnknownSession(_))));
        assert!(state.with_session(busy, |_| ()).await.is_ok());
        assert!(!state.sessions.read().await.contains_key(&idle));

        tokio::time::advance(Duration::from_secs(61)).await;
        state.insert_session(questions()).await;
        assert_eq!(state.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn removed_session_is_gone() {
        let state = state_with(SessionCfg::default());
        let (id, _) = state.insert_session(questions()).await;
        state.remove_session(id).await.unwrap();
        assert!(state.sessions.read().await.is_empty());
        assert!(matches!(state.remove_session(id).await, Err(SessionError::UnknownSession(x)) if x == id));
    }
}
