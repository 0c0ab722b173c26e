use std::sync::Arc;

use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::interview::registry::SessionRegistry;
use crate::llm_client::TextGenerator;
use crate::store::InterviewStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Text-generation collaborator. `LlmClient` in production.
    pub llm: Arc<dyn TextGenerator>,
    pub store: Arc<dyn InterviewStore>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Live interview sessions. Ended sessions are removed.
    pub sessions: Arc<SessionRegistry>,
    pub config: Config,
}
