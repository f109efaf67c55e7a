// Export route modules
pub mod elevenlabs;
pub mod health;

use crate::state::AppState;
use axum::Router;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::warn;

// Function to configure all routes
pub fn configure(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .merge(health::routes())
        .nest("/api", elevenlabs::routes(state));

    let router = match static_dir {
        Some(dir) if dir.is_dir() => {
            router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        Some(dir) => {
            warn!(
                "Frontend build directory {} not found; serving JSON root response.",
                dir.display()
            );
            router.merge(health::root_routes())
        }
        None => router.merge(health::root_routes()),
    };

    router.layer(cors)
}
