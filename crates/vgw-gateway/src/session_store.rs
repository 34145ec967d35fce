//! Session Store (spec component C8, §4.8).
//!
//! A concurrent map from session id to `Session`, plus a background sweeper
//! that evicts sessions idle past the TTL. Mirrors the shape of
//! `gglib-axum`'s `AxumContext` state map, scoped down to this one
//! responsibility.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use vgw_core::domain::session::Session;

#[derive(Debug, Clone, Copy)]
pub struct SessionStoreConfig {
    pub ttl: Duration,
    pub sweep_interval: StdDuration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self { ttl: Duration::minutes(30), sweep_interval: StdDuration::from_secs(5 * 60) }
    }
}

/// Holds every live `Session`, keyed by id (spec §4.8).
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    config: SessionStoreConfig,
    sweeper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(config: SessionStoreConfig) -> Arc<Self> {
        let store = Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            sweeper: std::sync::Mutex::new(None),
        });
        store.clone().spawn_sweeper();
        store
    }

    fn spawn_sweeper(self: Arc<Self>) {
        let interval = self.config.sweep_interval;
        let store = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                store.sweep().await;
            }
        });
        *self.sweeper.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);
    }

    async fn sweep(&self) {
        let mut expired = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for (id, session) in sessions.iter() {
                if !session.is_live(self.config.ttl).await {
                    expired.push(id.clone());
                }
            }
        }
        if !expired.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &expired {
                sessions.remove(id);
            }
        }
    }

    /// Create and insert a brand-new session.
    pub async fn create(&self, id: impl Into<String>) -> Arc<Session> {
        let session = Arc::new(Session::new(id));
        self.sessions.write().await.insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a session, returning it only if still within TTL; touches it
    /// on success (spec §4.8).
    pub async fn get_if_live(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(id).cloned()?;
        if session.is_live(self.config.ttl).await {
            session.touch().await;
            Some(session)
        } else {
            None
        }
    }

    pub async fn touch(&self, id: &str) {
        if let Some(session) = self.sessions.read().await.get(id) {
            session.touch().await;
        }
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn has_live(&self, id: &str) -> bool {
        self.get_if_live(id).await.is_some()
    }

    /// Stop the sweeper and drop all entries (spec §4.8 `destroy`).
    pub async fn destroy(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take() {
            handle.abort();
        }
        self.sessions.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionStoreConfig {
        SessionStoreConfig { ttl: Duration::minutes(30), sweep_interval: StdDuration::from_secs(3600) }
    }

    #[tokio::test]
    async fn created_session_is_retrievable_and_live() {
        let store = SessionStore::new(config());
        let session = store.create("s1").await;
        assert_eq!(session.id, "s1");
        assert!(store.has_live("s1").await);
        store.destroy().await;
    }

    #[tokio::test]
    async fn missing_session_is_not_live() {
        let store = SessionStore::new(config());
        assert!(store.get_if_live("nope").await.is_none());
        store.destroy().await;
    }

    #[tokio::test]
    async fn expired_session_is_not_returned() {
        let store = SessionStore::new(SessionStoreConfig { ttl: Duration::milliseconds(1), sweep_interval: StdDuration::from_secs(3600) });
        store.create("s1").await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(store.get_if_live("s1").await.is_none());
        store.destroy().await;
    }

    #[tokio::test]
    async fn remove_drops_the_session() {
        let store = SessionStore::new(config());
        store.create("s1").await;
        store.remove("s1").await;
        assert!(!store.has_live("s1").await);
        store.destroy().await;
    }

    #[tokio::test]
    async fn sweeper_evicts_expired_sessions_in_the_background() {
        let store = SessionStore::new(SessionStoreConfig {
            ttl: Duration::milliseconds(1),
            sweep_interval: StdDuration::from_millis(20),
        });
        store.create("s1").await;
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        assert!(store.sessions.read().await.get("s1").is_none());
        store.destroy().await;
    }
}
