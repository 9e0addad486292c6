//! Application state shared across all route handlers.

use crate::render::PageRenderer;
use crate::session::SessionStore;
use docu_core::AppResult;
use docu_knowledge::Trainer;
use std::time::Instant;

/// Shared application state, cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live browser sessions
    pub sessions: SessionStore,

    /// Builds conversation engines from uploads
    pub trainer: Trainer,

    /// Compiled page templates
    pub renderer: &'static PageRenderer,

    /// Server start time for uptime reporting
    pub start_time: Instant,
}

impl AppState {
    pub fn new(trainer: Trainer) -> AppResult<Self> {
        Ok(Self {
            sessions: SessionStore::new(),
            trainer,
            renderer: PageRenderer::shared()?,
            start_time: Instant::now(),
        })
    }

    /// Replace the default session store, e.g. to apply configured limits.
    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }
}
