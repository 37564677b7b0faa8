//! In-memory graph sessions.
//!
//! A session is created after the graph database accepted a set of
//! credentials and lives until logout or until it is older than the store's
//! time-to-live (the access token lifetime). Expired sessions are dropped on
//! lookup, on every new login and by the periodic sweep. Jobs submitted
//! under a session run against its credentials.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ragstream_core::job::GraphCredentials;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GraphSession {
    pub id: Uuid,
    pub credentials: GraphCredentials,
    pub created_at: DateTime<Utc>,
}

impl GraphSession {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at >= ttl
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, GraphSession>>,
    ttl: Duration,
}

impl SessionStore {
    /// A store whose sessions expire `ttl` after creation.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn create(&self, credentials: GraphCredentials) -> GraphSession {
        let now = Utc::now();
        let session = GraphSession {
            id: Uuid::new_v4(),
            credentials,
            created_at: now,
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired(self.ttl, now));
        sessions.insert(session.id, session.clone());
        session
    }

    /// The live session with `id`. An expired one is removed and `None`
    /// returned.
    pub async fn get(&self, id: Uuid) -> Option<GraphSession> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                None => return None,
                Some(s) if !s.is_expired(self.ttl, now) => return Some(s.clone()),
                Some(_) => {}
            }
        }
        self.sessions.write().await.remove(&id);
        tracing::debug!(session_id = %id, "Graph session expired");
        None
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.ttl, now));
        before - sessions.len()
    }

    /// Purge expired sessions every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    tracing::info!(removed, "Expired graph sessions purged");
                }
            }
        })
    }

    /// Returns `false` if no such session existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
