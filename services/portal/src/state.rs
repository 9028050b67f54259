//! Application state shared across handlers

use std::sync::Arc;

use crate::session::SessionManager;
use crate::shell::Portal;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub portal: Arc<Portal>,
    pub sessions: SessionManager,
}
