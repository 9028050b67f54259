//! Browser sessions
//!
//! A [`Session`] is a plain value: the shell receives one with every action
//! and hands back the updated one. [`SessionManager`] keeps them in memory
//! between requests, keyed by the id carried in the session cookie.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::page::Page;

/// State of one browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Id carried in the session cookie
    pub id: Uuid,
    /// Page the session is on
    pub page: Page,
    /// Signed-in user, if any
    pub username: Option<String>,
    /// Vehicle number last entered on the alert panel
    pub vehicle_no: String,
    /// Map link of the last successful location lookup
    pub location_link: Option<String>,
}

impl Session {
    /// A fresh session on the home page
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// A fresh session on the home page with a known id
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            page: Page::Home,
            username: None,
            vehicle_no: String::new(),
            location_link: None,
        }
    }

    /// Whether a user is signed in
    pub fn is_signed_in(&self) -> bool {
        self.username.is_some()
    }

    /// Page to render. Authenticated pages fall back to home without a user.
    pub fn effective_page(&self) -> Page {
        if self.page.requires_sign_in() && !self.is_signed_in() {
            Page::Home
        } else {
            self.page
        }
    }

    /// Drop everything but the id
    pub fn reset(&mut self) {
        *self = Self::with_id(self.id);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored session and the last time a request used it
#[derive(Debug)]
struct SessionEntry {
    session: Session,
    last_seen: Instant,
}

/// In-memory session manager
///
/// Sessions idle for longer than the idle timeout are dropped: on lookup,
/// and in a sweep whenever a new session is created.
#[derive(Clone)]
pub struct SessionManager {
    /// Stored sessions keyed by id
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    /// How long a session survives without requests
    idle_timeout: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Create and store a new session
    pub async fn create_session(&self) -> Session {
        self.create_session_at(Instant::now()).await
    }

    /// Get a session by id, refreshing its idle timer
    pub async fn get_session(&self, id: Uuid) -> Option<Session> {
        self.get_session_at(id, Instant::now()).await
    }

    /// Store the latest state of a session
    pub async fn update_session(&self, session: Session) {
        self.update_session_at(session, Instant::now()).await
    }

    async fn create_session_at(&self, now: Instant) -> Session {
        let session = Session::new();
        info!("Creating session: {}", session.id);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry, now));
        if sessions.len() < before {
            debug!("Evicted {} idle session(s)", before - sessions.len());
        }

        sessions.insert(
            session.id,
            SessionEntry {
                session: session.clone(),
                last_seen: now,
            },
        );
        session
    }

    async fn get_session_at(&self, id: Uuid, now: Instant) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;

        if self.is_idle(entry, now) {
            sessions.remove(&id);
            debug!("Session {} expired", id);
            return None;
        }

        entry.last_seen = now;
        Some(entry.session.clone())
    }

    async fn update_session_at(&self, session: Session, now: Instant) {
        self.sessions.write().await.insert(
            session.id,
            SessionEntry {
                session,
                last_seen: now,
            },
        );
    }

    fn is_idle(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) >= self.idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_on_home() {
        let session = Session::new();
        assert_eq!(session.page, Page::Home);
        assert!(!session.is_signed_in());
        assert_eq!(session.location_link, None);
    }

    #[test]
    fn test_authenticated_page_without_user_renders_home() {
        let mut session = Session::new();
        session.page = Page::AlertPanel;
        assert_eq!(session.effective_page(), Page::Home);

        session.username = Some("rider".to_string());
        assert_eq!(session.effective_page(), Page::AlertPanel);
    }

    #[test]
    fn test_reset_keeps_only_the_id() {
        let mut session = Session::new();
        let id = session.id;
        session.page = Page::Dashboard;
        session.username = Some("rider".to_string());
        session.vehicle_no = "KDA 123X".to_string();
        session.location_link = Some("https://maps.google.com/?q=1,2".to_string());

        session.reset();
        assert_eq!(session, Session::with_id(id));
    }

    #[tokio::test]
    async fn test_session_manager_lifecycle() {
        let sessions = SessionManager::new(Duration::from_secs(60));

        let mut session = sessions.create_session().await;
        assert_eq!(sessions.get_session(session.id).await, Some(session.clone()));

        session.page = Page::SignIn;
        sessions.update_session(session.clone()).await;
        assert_eq!(
            sessions.get_session(session.id).await.map(|s| s.page),
            Some(Page::SignIn)
        );

        assert_eq!(sessions.get_session(Uuid::new_v4()).await, None);
    }

    #[tokio::test]
    async fn test_idle_session_expires_on_lookup() {
        let sessions = SessionManager::new(Duration::from_secs(60));
        let now = Instant::now();

        let session = sessions.create_session_at(now).await;

        // Each lookup restarts the idle timer
        let touched = now + Duration::from_secs(59);
        assert!(sessions.get_session_at(session.id, touched).await.is_some());
        assert!(sessions
            .get_session_at(session.id, touched + Duration::from_secs(59))
            .await
            .is_some());

        let expired = touched + Duration::from_secs(59 + 60);
        assert_eq!(sessions.get_session_at(session.id, expired).await, None);
        assert!(sessions.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_sessions_do_not_accumulate() {
        let sessions = SessionManager::new(Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..1000 {
            sessions.create_session_at(now).await;
        }
        assert_eq!(sessions.sessions.read().await.len(), 1000);

        let latest = sessions
            .create_session_at(now + Duration::from_secs(60))
            .await;
        let stored = sessions.sessions.read().await;
        assert_eq!(stored.len(), 1);
        assert!(stored.contains_key(&latest.id));
    }
}
