mod configuration;
mod error;
mod routes;
mod state;

use agentdesk::{AgentService, Offload};
use configuration::AppSettings;
use state::AppState;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before reading configuration
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = AppSettings::new()?;
    if !settings.agent.has_credentials() {
        warn!("ELEVENLABS_API_KEY is not set; platform operations will fail until it is");
    }

    let addr = settings.server.socket_addr()?;
    let offload = Offload::new(settings.server.offload_capacity);
    let service = AgentService::new(Arc::new(settings.agent), offload)?;
    let app = routes::configure(AppState::new(service), settings.server.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
