//! State shared by every channel: the assistant and the live sessions.
//!
//! Channels get an `Arc<CommsState>` and only see the methods below.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::warn;
use uuid::Uuid;

use crate::assistant::{SessionState, StudyAssistant};

/// Lifecycle events a channel reports back to the comms manager.
#[derive(Debug)]
pub enum CommsEvent {
    SessionOpened { channel_id: String, session_id: Uuid },
    SessionClosed { channel_id: String, session_id: Uuid },
    ChannelShutdown { channel_id: String },
}

pub type SharedSession = Arc<Mutex<SessionState>>;

/// Live sessions keyed by id. Each session sits behind its own mutex so
/// turns within one session are serialized while different sessions run
/// independently.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub async fn insert(&self, state: SessionState) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(state));
        self.sessions.write().await.insert(id, session.clone());
        (id, session)
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

pub struct CommsState {
    assistant: StudyAssistant,
    sessions: SessionRegistry,
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(assistant: StudyAssistant, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { assistant, sessions: SessionRegistry::default(), event_tx }
    }

    pub fn assistant(&self) -> &StudyAssistant {
        &self.assistant
    }

    /// Create a fresh session at the main menu and register it.
    pub async fn open_session(&self, channel_id: &str) -> (Uuid, SharedSession) {
        let (id, session) = self.sessions.insert(self.assistant.new_session()).await;
        self.report_event(CommsEvent::SessionOpened { channel_id: channel_id.to_string(), session_id: id });
        (id, session)
    }

    pub async fn session(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.get(id).await
    }

    /// Drop a session and all of its state. Returns false if it was unknown.
    pub async fn close_session(&self, channel_id: &str, id: &Uuid) -> bool {
        let removed = self.sessions.remove(id).await;
        if removed {
            self.report_event(CommsEvent::SessionClosed { channel_id: channel_id.to_string(), session_id: *id });
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// Non-blocking; the event is dropped with a warning if the manager is
    /// behind or gone.
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> (CommsState, mpsc::Receiver<CommsEvent>) {
        let assistant = StudyAssistant::from_config(&Config::test_default()).unwrap();
        let (tx, rx) = mpsc::channel(8);
        (CommsState::new(assistant, tx), rx)
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let (state, _rx) = state();
        let (a, sa) = state.open_session("test").await;
        let (b, _) = state.open_session("test").await;
        assert_ne!(a, b);
        sa.lock().await.set_slot("x", serde_json::json!(1));
        let sb = state.session(&b).await.unwrap();
        assert!(sb.lock().await.slot("x").is_none());
        assert_eq!(state.session_count().await, 2);
    }

    #[tokio::test]
    async fn close_removes_and_reports() {
        let (state, mut rx) = state();
        let (id, _) = state.open_session("test").await;
        assert!(state.close_session("test", &id).await);
        assert!(!state.close_session("test", &id).await);
        assert!(state.session(&id).await.is_none());
        assert!(matches!(rx.recv().await, Some(CommsEvent::SessionOpened { .. })));
        assert!(matches!(rx.recv().await, Some(CommsEvent::SessionClosed { .. })));
    }
}
