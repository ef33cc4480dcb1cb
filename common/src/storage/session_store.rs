use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    error::AppError,
    storage::types::session::{Session, SessionItem},
};

const MAX_SESSION_ID_LEN: usize = 128;

/// Process-lifetime store of upload sessions keyed by the client-supplied id.
///
/// Nothing is persisted; a restart drops every session. Concurrent writes to the
/// same session are serialized by the lock and the last one wins.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` to the session, creating the session on first use. An existing item of
    /// the same kind is replaced. Returns a snapshot of the updated session.
    pub async fn upsert_item(
        &self,
        session_id: &str,
        item: SessionItem,
    ) -> Result<Session, AppError> {
        validate_session_id(session_id)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(%session_id, "Creating new session");
            Session::new(session_id)
        });

        let kind = item.kind;
        if session.items.insert(kind, item).is_some() {
            debug!(%session_id, %kind, "Replaced existing session item");
        }
        session.updated_at = Utc::now();

        Ok(session.clone())
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

pub fn validate_session_id(session_id: &str) -> Result<(), AppError> {
    if session_id.is_empty() {
        return Err(AppError::Validation("Session id is required".to_string()));
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::Validation(format!(
            "Session id must be at most {MAX_SESSION_ID_LEN} characters"
        )));
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Session id may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}
