//! Editing sessions
//!
//! An uploaded document is kept in memory under a random token until it
//! expires. Each edit replaces the stored document and refreshes the expiry,
//! so successive edits build on each other. Sessions never share state.
//! Edits to one session are serialised by a per-session lock held from
//! reading the document until the result is stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::ServerError;

/// One uploaded document and its lifetime.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub id: Uuid,
    pub file_name: String,
    pub document: Bytes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    edit_lock: Arc<Mutex<()>>,
}

impl EditSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Shared store of editing sessions
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: RwLock<HashMap<Uuid, EditSession>>,
    ttl: chrono::Duration,
    /// 0 = unlimited
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: chrono::Duration, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                ttl,
                max_sessions,
            }),
        }
    }

    /// Store a freshly uploaded document under a new token.
    pub async fn create(
        &self,
        file_name: impl Into<String>,
        document: Bytes,
    ) -> Result<EditSession, ServerError> {
        let now = Utc::now();
        let mut sessions = self.inner.sessions.write().await;

        if self.inner.max_sessions > 0 {
            let live = sessions.values().filter(|s| !s.is_expired_at(now)).count();
            if live >= self.inner.max_sessions {
                return Err(ServerError::TooManySessions(self.inner.max_sessions));
            }
        }

        let session = EditSession {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            document,
            created_at: now,
            updated_at: now,
            expires_at: now + self.inner.ttl,
            edit_lock: Arc::new(Mutex::new(())),
        };
        sessions.insert(session.id, session.clone());

        tracing::info!(
            session_id = %session.id,
            file_name = %session.file_name,
            size = session.document.len(),
            "Created edit session"
        );

        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<EditSession, ServerError> {
        let sessions = self.inner.sessions.read().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| ServerError::DocumentNotFound(id.to_string()))?;

        if session.is_expired_at(Utc::now()) {
            return Err(ServerError::SessionExpired(id.to_string()));
        }
        Ok(session.clone())
    }

    /// Wait for exclusive edit access to a session.
    ///
    /// The returned session is read after the lock is taken, so it reflects
    /// every edit that finished before. Hold the guard until the new
    /// document has been stored with [`SessionStore::replace_document`].
    pub async fn begin_edit(
        &self,
        id: Uuid,
    ) -> Result<(OwnedMutexGuard<()>, EditSession), ServerError> {
        let lock = self.get(id).await?.edit_lock;
        let guard = lock.lock_owned().await;
        let session = self.get(id).await?;
        Ok((guard, session))
    }

    /// Make `document` the session's current document and refresh its expiry.
    pub async fn replace_document(
        &self,
        id: Uuid,
        document: Bytes,
    ) -> Result<EditSession, ServerError> {
        let now = Utc::now();
        let mut sessions = self.inner.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| ServerError::DocumentNotFound(id.to_string()))?;

        if session.is_expired_at(now) {
            return Err(ServerError::SessionExpired(id.to_string()));
        }

        session.document = document;
        session.updated_at = now;
        session.expires_at = now + self.inner.ttl;

        tracing::debug!(session_id = %id, size = session.document.len(), "Replaced session document");
        Ok(session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), ServerError> {
        let mut sessions = self.inner.sessions.write().await;
        if sessions.remove(&id).is_none() {
            return Err(ServerError::DocumentNotFound(id.to_string()));
        }
        tracing::info!(session_id = %id, "Removed edit session");
        Ok(())
    }

    /// Drop every expired session, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        let removed = before - sessions.len();

        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Cleaned up expired sessions");
        }
        removed
    }

    /// Number of stored sessions, expired ones included until swept.
    pub async fn count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Run `cleanup_expired` every `interval` until the task is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.cleanup_expired().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn store() -> SessionStore {
        SessionStore::new(chrono::Duration::minutes(30), 0)
    }

    fn expired_store() -> SessionStore {
        SessionStore::new(chrono::Duration::zero(), 0)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store();
        let session = store
            .create("report.pdf", Bytes::from_static(b"%PDF-1"))
            .await
            .unwrap();
        assert!(session.expires_at > session.created_at);

        let fetched = store.get(session.id).await.unwrap();
        assert_eq!(fetched.file_name, "report.pdf");
        assert_eq!(fetched.document, Bytes::from_static(b"%PDF-1"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = store();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(ServerError::DocumentNotFound(_))
        ));
        assert!(matches!(
            store.remove(Uuid::new_v4()).await,
            Err(ServerError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_document_refreshes_expiry() {
        let store = store();
        let session = store.create("a.pdf", Bytes::from_static(b"one")).await.unwrap();
        let updated = store
            .replace_document(session.id, Bytes::from_static(b"two"))
            .await
            .unwrap();

        assert_eq!(updated.document, Bytes::from_static(b"two"));
        assert!(updated.expires_at >= session.expires_at);
        assert_eq!(updated.created_at, session.created_at);
        assert_eq!(store.get(session.id).await.unwrap().document, updated.document);
    }

    #[tokio::test]
    async fn test_concurrent_edits_do_not_lose_updates() {
        let store = store();
        let id = store.create("a.pdf", Bytes::new()).await.unwrap().id;

        let append = move |store: SessionStore, byte: u8| async move {
            let (_guard, current) = store.begin_edit(id).await.unwrap();
            tokio::task::yield_now().await;
            let mut next = current.document.to_vec();
            next.push(byte);
            store.replace_document(id, next.into()).await.unwrap();
        };

        let tasks: Vec<_> = (0..8u8)
            .map(|byte| tokio::spawn(append(store.clone(), byte)))
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let mut document = store.get(id).await.unwrap().document.to_vec();
        document.sort_unstable();
        assert_eq!(document, (0..8u8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_begin_edit_on_unknown_session_is_not_found() {
        assert!(matches!(
            store().begin_edit(Uuid::new_v4()).await,
            Err(ServerError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store();
        let a = store.create("a.pdf", Bytes::from_static(b"a")).await.unwrap();
        let b = store.create("b.pdf", Bytes::from_static(b"b")).await.unwrap();

        store
            .replace_document(a.id, Bytes::from_static(b"a2"))
            .await
            .unwrap();

        assert_eq!(store.get(a.id).await.unwrap().document, Bytes::from_static(b"a2"));
        assert_eq!(store.get(b.id).await.unwrap().document, Bytes::from_static(b"b"));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_cleaned_up() {
        let store = expired_store();
        let session = store.create("a.pdf", Bytes::from_static(b"a")).await.unwrap();

        assert!(matches!(
            store.get(session.id).await,
            Err(ServerError::SessionExpired(_))
        ));
        assert!(matches!(
            store.replace_document(session.id, Bytes::new()).await,
            Err(ServerError::SessionExpired(_))
        ));

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.count().await, 0);
        assert!(matches!(
            store.get(session.id).await,
            Err(ServerError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_session_cap() {
        let store = SessionStore::new(chrono::Duration::minutes(5), 1);
        let first = store.create("a.pdf", Bytes::new()).await.unwrap();
        assert!(matches!(
            store.create("b.pdf", Bytes::new()).await,
            Err(ServerError::TooManySessions(1))
        ));

        store.remove(first.id).await.unwrap();
        assert!(store.create("b.pdf", Bytes::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_sessions_do_not_count_towards_cap() {
        let store = SessionStore::new(chrono::Duration::zero(), 1);
        store.create("a.pdf", Bytes::new()).await.unwrap();
        assert!(store.create("b.pdf", Bytes::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_sessions() {
        let store = expired_store();
        store.create("a.pdf", Bytes::new()).await.unwrap();
        store.create("b.pdf", Bytes::new()).await.unwrap();

        let sweeper = store.spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        sweeper.abort();

        assert_eq!(store.count().await, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_each_session_keeps_its_own_document(
            docs in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..32), 1..8)
        ) {
            let store = store();
            let ids = tokio_test::block_on(async {
                let mut ids = Vec::new();
                for doc in &docs {
                    let session = store.create("p.pdf", Bytes::from(doc.clone())).await.unwrap();
                    ids.push(session.id);
                }
                ids
            });

            for (id, doc) in ids.iter().zip(&docs) {
                let stored = tokio_test::block_on(store.get(*id)).unwrap();
                prop_assert_eq!(stored.document.as_ref(), doc.as_slice());
            }
        }
    }
}
