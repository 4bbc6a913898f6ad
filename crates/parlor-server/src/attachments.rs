//! In-memory attachment store.
//!
//! Uploaded images and rendered PDF pages never touch the disk: they are
//! held here as base64-encoded PNG pages, keyed by an opaque id, until a
//! generation request consumes them or the owning session disconnects.
//!
//! The store is a single explicitly-owned map behind a mutex. All
//! operations are brief map lookups that never span an `.await` point, so
//! a synchronous lock is safe. Removal is idempotent: entries are deleted
//! defensively from more than one code path (consumption, disconnect,
//! background sweep) and "already gone" is not an error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One uploaded attachment: a single page for images, one page per PDF page.
#[derive(Debug, Clone)]
struct Attachment {
    /// Base64-encoded PNG pages.
    pages: Vec<String>,
    /// The session that uploaded it. Resolution is restricted to the owner.
    owner: Uuid,
    uploaded_at: Instant,
}

/// Shared in-memory store for uploaded attachments.
#[derive(Clone, Default)]
pub struct AttachmentStore {
    inner: Arc<Mutex<HashMap<String, Attachment>>>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an attachment for a session, returning its opaque id.
    pub fn insert(&self, owner: Uuid, pages: Vec<String>) -> String {
        let id = format!("{}-{}", owner.simple(), Uuid::new_v4().simple());
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(
            id.clone(),
            Attachment {
                pages,
                owner,
                uploaded_at: Instant::now(),
            },
        );
        id
    }

    /// Returns the pages of an attachment, if it exists and belongs to the
    /// requesting session.
    pub fn resolve(&self, id: &str, owner: Uuid) -> Option<Vec<String>> {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let attachment = map.get(id)?;
        if attachment.owner != owner {
            tracing::warn!(attachment_id = %id, "attachment resolve denied: wrong session");
            return None;
        }
        Some(attachment.pages.clone())
    }

    /// Removes an attachment. Idempotent: returns `false` when the entry
    /// was already gone.
    pub fn remove(&self, id: &str) -> bool {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(id).is_some()
    }

    /// Removes every attachment owned by a session. Returns how many were
    /// dropped.
    pub fn purge_session(&self, owner: Uuid) -> usize {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, attachment| attachment.owner != owner);
        before - map.len()
    }

    /// Removes attachments older than `max_age`. Returns how many were
    /// dropped.
    pub fn sweep_older_than(&self, max_age: Duration) -> usize {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, attachment| attachment.uploaded_at.elapsed() < max_age);
        before - map.len()
    }

    /// Number of stored attachments.
    pub fn len(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_resolve_round_trip() {
        let store = AttachmentStore::new();
        let session = Uuid::new_v4();
        let id = store.insert(session, vec!["cGFnZQ==".to_string()]);

        let pages = store.resolve(&id, session).expect("owner can resolve");
        assert_eq!(pages, vec!["cGFnZQ=="]);
    }

    #[test]
    fn resolve_is_session_scoped() {
        let store = AttachmentStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let id = store.insert(owner, vec!["x".to_string()]);

        assert!(store.resolve(&id, other).is_none());
        assert!(store.resolve(&id, owner).is_some());
    }

    #[test]
    fn remove_is_idempotent() {
        let store = AttachmentStore::new();
        let id = store.insert(Uuid::new_v4(), vec!["x".to_string()]);

        assert!(store.remove(&id));
        assert!(!store.remove(&id), "second removal is a no-op");
        assert!(!store.remove("never-existed"));
    }

    #[test]
    fn purge_session_only_touches_owner() {
        let store = AttachmentStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.insert(a, vec!["1".to_string()]);
        store.insert(a, vec!["2".to_string()]);
        let keep = store.insert(b, vec!["3".to_string()]);

        assert_eq!(store.purge_session(a), 2);
        assert_eq!(store.len(), 1);
        assert!(store.resolve(&keep, b).is_some());
    }

    #[test]
    fn sweep_keeps_fresh_entries() {
        let store = AttachmentStore::new();
        store.insert(Uuid::new_v4(), vec!["1".to_string()]);

        assert_eq!(store.sweep_older_than(Duration::from_secs(3600)), 0);
        assert_eq!(store.sweep_older_than(Duration::ZERO), 1);
        assert!(store.is_empty());
    }
}
