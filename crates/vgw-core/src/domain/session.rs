//! Session domain type (spec §3, §4.8).

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::domain::chat::ConversationState;
use crate::domain::playbook::PlaybookRuntime;
use crate::domain::utterance::VisionAttachment;

/// Per-client durable state spanning multiple connections for up to TTL
/// (spec §3, §8: `hasSession(S)` <=> `now - last_activity_at(S) <= TTL`).
///
/// Invariant: at most one active turn per session — enforced by `turn_lock`,
/// which every turn runner must hold for its full duration (spec §4.6
/// "Turn serialization").
pub struct Session {
    pub id: String,
    pub history: Mutex<ConversationState>,
    pub playbook: Mutex<Option<PlaybookRuntime>>,
    pub pending_vision: Mutex<Vec<VisionAttachment>>,
    /// Serializes turns for this session (spec §4.6, §5 "Ordering guarantees").
    pub turn_lock: Mutex<()>,
    pub created_at: DateTime<Utc>,
    last_activity_at: Mutex<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: Mutex::new(ConversationState::new()),
            playbook: Mutex::new(None),
            pending_vision: Mutex::new(Vec::new()),
            turn_lock: Mutex::new(()),
            created_at: now,
            last_activity_at: Mutex::new(now),
        }
    }

    pub async fn touch(&self) {
        *self.last_activity_at.lock().await = Utc::now();
    }

    pub async fn last_activity_at(&self) -> DateTime<Utc> {
        *self.last_activity_at.lock().await
    }

    pub async fn is_live(&self, ttl: Duration) -> bool {
        Utc::now() - self.last_activity_at().await <= ttl
    }

    /// Drain the pending vision queue, returning the attachments to attach
    /// to the next utterance (spec §4.3 step 3).
    pub async fn drain_vision(&self) -> Vec<VisionAttachment> {
        std::mem::take(&mut *self.pending_vision.lock().await)
    }

    pub async fn queue_vision(&self, attachments: Vec<VisionAttachment>) {
        self.pending_vision.lock().await.extend(attachments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_session_is_live() {
        let session = Session::new("s1");
        assert!(session.is_live(Duration::minutes(30)).await);
    }

    #[tokio::test]
    async fn touch_updates_last_activity() {
        let session = Session::new("s1");
        let before = session.last_activity_at().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        session.touch().await;
        assert!(session.last_activity_at().await >= before);
    }

    #[tokio::test]
    async fn vision_queue_drains_once() {
        let session = Session::new("s1");
        session
            .queue_vision(vec![VisionAttachment { mime_type: "image/png".into(), data: "AA==".into() }])
            .await;
        assert_eq!(session.drain_vision().await.len(), 1);
        assert!(session.drain_vision().await.is_empty());
    }
}
