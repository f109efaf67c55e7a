use crate::error::ApiError;
use crate::state::AppState;
use agentdesk::models::{
    ConversationToken, PromptSnapshot, PromptSuggestion, PromptUpdate, Transcription,
    TranscriptionRequest,
};
use axum::{
    extract::{DefaultBodyLimit, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

/// Recorded feedback arrives base64-encoded inside JSON, well past axum's
/// default body limit.
const MAX_TRANSCRIBE_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct ConversationTokenRequest {
    #[serde(default)]
    agent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptQuery {
    #[serde(default)]
    agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptSuggestionRequest {
    feedback: String,
    #[serde(default)]
    agent_id: Option<String>,
}

async fn issue_conversation_token(
    State(state): State<AppState>,
    Json(body): Json<ConversationTokenRequest>,
) -> Result<Json<ConversationToken>, ApiError> {
    let token = state
        .service
        .issue_conversation_token(body.agent_id.as_deref())
        .await?;
    info!(agent_id = token.agent_id().unwrap_or_default(), "issued conversation token");
    Ok(Json(token))
}

async fn fetch_prompt(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> Result<Json<PromptSnapshot>, ApiError> {
    let snapshot = state.service.fetch_prompt(query.agent_id.as_deref()).await?;
    Ok(Json(snapshot))
}

async fn save_prompt(
    State(state): State<AppState>,
    Json(body): Json<PromptUpdate>,
) -> Result<Json<PromptSnapshot>, ApiError> {
    let snapshot = state.service.update_prompt(&body).await?;
    Ok(Json(snapshot))
}

async fn suggest_prompt(
    State(state): State<AppState>,
    Json(body): Json<PromptSuggestionRequest>,
) -> Result<Json<PromptSuggestion>, ApiError> {
    let suggestion = state
        .service
        .suggest_prompt(&body.feedback, body.agent_id.as_deref())
        .await?;
    Ok(Json(suggestion))
}

async fn transcribe(
    State(state): State<AppState>,
    Json(body): Json<TranscriptionRequest>,
) -> Result<Json<Transcription>, ApiError> {
    let transcription = state.service.transcribe_audio(&body).await?;
    Ok(Json(transcription))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/elevenlabs/conversation-token",
            post(issue_conversation_token),
        )
        .route("/elevenlabs/prompt", get(fetch_prompt).put(save_prompt))
        .route("/elevenlabs/prompt/suggest", post(suggest_prompt))
        .route(
            "/elevenlabs/transcribe",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_TRANSCRIBE_BODY_BYTES)),
        )
        .with_state(state)
}
