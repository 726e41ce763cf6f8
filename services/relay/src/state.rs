//! Process-wide event registry.
//!
//! The registry is the only piece of shared mutable state outside an event
//! actor, and it only ever guards insert-if-absent lookups — never the hot
//! per-event path, which lives entirely inside that event's actor task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::event::EventHandle;

#[derive(Clone)]
pub struct AppState {
    hmac_secret: Arc<[u8]>,
    events: Arc<RwLock<HashMap<String, EventHandle>>>,
}

impl AppState {
    pub fn new(hmac_secret: String) -> Self {
        Self {
            hmac_secret: Arc::from(hmac_secret.into_bytes().into_boxed_slice()),
            events: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn hmac_secret(&self) -> &[u8] {
        &self.hmac_secret
    }

    /// Looks up the event actor for `event_id`, spawning one on first
    /// reference. The event key namespace never shrinks.
    pub async fn get_or_create(&self, event_id: &str) -> EventHandle {
        {
            let events = self.events.read().await;
            if let Some(handle) = events.get(event_id) {
                return handle.clone();
            }
        }

        let mut events = self.events.write().await;
        if let Some(handle) = events.get(event_id) {
            return handle.clone();
        }

        let ws_path = format!("/e/{event_id}/ws");
        let handle = EventHandle::spawn(event_id.to_owned(), ws_path, self.hmac_secret.to_vec());
        events.insert(event_id.to_owned(), handle.clone());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_returns_the_same_handle_for_repeat_lookups() {
        let state = AppState::new("secret".to_owned());
        let a = state.get_or_create("pool-party").await;
        a.register_pc("desk-1".to_owned()).await.unwrap();

        let b = state.get_or_create("pool-party").await;
        // Same underlying actor: a pcid registered through `a` is visible via `b`.
        assert!(b
            .pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn distinct_event_ids_get_independent_actors() {
        let state = AppState::new("secret".to_owned());
        let a = state.get_or_create("event-a").await;
        a.register_pc("desk-1".to_owned()).await.unwrap();

        let b = state.get_or_create("event-b").await;
        let err = b
            .pending_sid("desk-1".to_owned(), "ABCDEFGHIJ".to_owned(), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::RelayError::PcNotRegistered));
    }
}
