use std::sync::Arc;

use crate::config::Config;
use crate::layout::LayoutBackend;
use crate::preview::{PreviewRegistry, PreviewSession, SessionSettings};
use uuid::Uuid;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Live preview sessions, one per resume being edited.
    pub registry: PreviewRegistry,
    /// Layout engine that measures blocks for every session.
    pub backend: Arc<dyn LayoutBackend>,
    pub settings: SessionSettings,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn LayoutBackend>) -> Self {
        let settings = config.session_settings();
        Self {
            config,
            registry: PreviewRegistry::default(),
            backend,
            settings,
        }
    }

    pub fn session(&self, resume_id: Uuid) -> Option<Arc<PreviewSession>> {
        self.registry.get(resume_id)
    }

    pub fn open_session(&self, resume_id: Uuid) -> Arc<PreviewSession> {
        self.registry
            .get_or_create(resume_id, &self.backend, self.settings)
    }
}
