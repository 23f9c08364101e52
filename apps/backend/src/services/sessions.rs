//! In-process registry of live review sessions.
//!
//! Each session sits behind its own async mutex that a request holds only while
//! it runs. Nothing is locked while the user is looking at a card.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use review_core::{OwnerId, ReviewSession};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::error::{ApiError, Result};

pub type SharedSession = Arc<AsyncMutex<ReviewSession>>;

struct Entry {
    owner: OwnerId,
    session: SharedSession,
}

/// Live sessions keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a started session and return its id.
    pub fn insert(&self, session: ReviewSession) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let owner = session.owner();
        let shared = Arc::new(AsyncMutex::new(session));
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id,
                Entry {
                    owner,
                    session: shared.clone(),
                },
            );
        tracing::debug!(session_id = %id, %owner, "session registered");
        (id, shared)
    }

    /// Look up a session of `owner`. Other owners' sessions are not found.
    pub fn get(&self, owner: OwnerId, id: Uuid) -> Result<SharedSession> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| ApiError::NotFound(format!("session {id}")))
    }

    /// Forget a session.
    pub fn remove(&self, owner: OwnerId, id: Uuid) -> Result<SharedSession> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.get(&id) {
            Some(entry) if entry.owner == owner => {}
            _ => return Err(ApiError::NotFound(format!("session {id}"))),
        }
        let entry = sessions
            .remove(&id)
            .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;
        tracing::debug!(session_id = %id, "session removed");
        Ok(entry.session)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
