//! WebSocket session registry and cancellation flags.
//!
//! Each connected client gets one session: an event channel back to the
//! socket, a cancellation flag for the in-flight generation, and a guard
//! ensuring at most one generation runs per connection at a time.

use crate::api_ws::ServerEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Cooperative cancellation flag for one session's in-flight generation.
///
/// Reset at the start of each generation request, set by a client `stop`
/// signal, and polled by the generation loop between token-emission steps.
/// Cancellation is not preemptive: the current token (and any synthesis it
/// triggered) finishes processing first.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the flag for a new generation request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Requests cancellation of the in-flight generation.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct SessionEntry {
    events: mpsc::Sender<ServerEvent>,
    cancel: CancelFlag,
    generating: Arc<AtomicBool>,
}

/// Registry of live WebSocket sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns its id.
    pub async fn register(&self, events: mpsc::Sender<ServerEvent>) -> Uuid {
        let session_id = Uuid::new_v4();
        self.sessions.write().await.insert(
            session_id,
            SessionEntry {
                events,
                cancel: CancelFlag::new(),
                generating: Arc::new(AtomicBool::new(false)),
            },
        );
        session_id
    }

    /// Removes a session on disconnect.
    pub async fn remove(&self, session_id: Uuid) {
        self.sessions.write().await.remove(&session_id);
    }

    /// Returns whether a session is currently registered.
    pub async fn exists(&self, session_id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&session_id)
    }

    /// Returns the session's cancellation flag.
    pub async fn cancel_flag(&self, session_id: Uuid) -> Option<CancelFlag> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|entry| entry.cancel.clone())
    }

    /// Sets the session's cancellation flag. Returns `false` for unknown
    /// sessions.
    pub async fn trigger_stop(&self, session_id: Uuid) -> bool {
        match self.sessions.read().await.get(&session_id) {
            Some(entry) => {
                entry.cancel.trigger();
                true
            }
            None => false,
        }
    }

    /// Attempts to claim the session's single generation slot.
    ///
    /// Returns the reset cancellation flag on success, `None` if a
    /// generation is already in flight (or the session is gone). The caller
    /// must call [`SessionRegistry::end_generation`] when the turn finishes.
    pub async fn begin_generation(&self, session_id: Uuid) -> Option<CancelFlag> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&session_id)?;
        if entry
            .generating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        entry.cancel.reset();
        Some(entry.cancel.clone())
    }

    /// Releases the session's generation slot.
    pub async fn end_generation(&self, session_id: Uuid) {
        if let Some(entry) = self.sessions.read().await.get(&session_id) {
            entry.generating.store(false, Ordering::SeqCst);
        }
    }

    /// Returns the event sender for a session.
    pub async fn event_sender(&self, session_id: Uuid) -> Option<mpsc::Sender<ServerEvent>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|entry| entry.events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_and_remove() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(8);

        let id = registry.register(tx).await;
        assert!(registry.exists(id).await);

        registry.remove(id).await;
        assert!(!registry.exists(id).await);
        assert!(!registry.trigger_stop(id).await);
    }

    #[tokio::test]
    async fn stop_sets_the_cancel_flag() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(8);
        let id = registry.register(tx).await;

        let cancel = registry.cancel_flag(id).await.expect("flag exists");
        assert!(!cancel.is_cancelled());

        assert!(registry.trigger_stop(id).await);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn generation_slot_is_exclusive_and_resets_cancel() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(8);
        let id = registry.register(tx).await;

        // A stale stop from a previous turn is cleared on begin.
        registry.trigger_stop(id).await;

        let cancel = registry.begin_generation(id).await.expect("slot is free");
        assert!(!cancel.is_cancelled(), "flag resets at generation start");

        assert!(
            registry.begin_generation(id).await.is_none(),
            "second concurrent generation is refused"
        );

        registry.end_generation(id).await;
        assert!(registry.begin_generation(id).await.is_some());
    }
}
