use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Voice test backend is running" }))
}

pub fn routes() -> Router {
    Router::new().route("/health", get(health))
}

/// JSON answer at `/` for deployments without a bundled frontend.
pub fn root_routes() -> Router {
    Router::new().route("/", get(root))
}
