use agentdesk::AgentService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgentService>,
}

impl AppState {
    pub fn new(service: AgentService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
