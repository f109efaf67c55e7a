//! The five operations callers reach: token issuance, prompt read, prompt
//! update, prompt suggestion and transcription.
//!
//! Every operation checks its preconditions (agent id, keys, input) before
//! the first outbound call and reports any failure as a [`ServiceError`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::openai::OpenAiClient;
use crate::clients::platform::PlatformClient;
use crate::clients::sdk::{extract_transcript, HttpVoiceSdk, SttUpload, VoiceSdk};
use crate::config::Settings;
use crate::credentials::{require_credential, resolve_agent_id};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{
    ConversationToken, PromptSnapshot, PromptSuggestion, PromptUpdate, Transcription,
    TranscriptionRequest,
};
use crate::offload::Offload;
use crate::prompt::{build_update_payload, ensure_prompt_text, extract_prompt, updated_snapshot};

pub const SUGGESTION_SYSTEM_PROMPT: &str = "You refine system prompts for voice agents. \
Rewrite the prompt so it addresses the developer's feedback while preserving every \
instruction that is still helpful. Return only the full prompt text, with no commentary, \
headings or code fences.";

pub struct AgentService {
    settings: Arc<Settings>,
    platform: PlatformClient,
    llm: OpenAiClient,
    sdk: Arc<dyn VoiceSdk>,
    offload: Offload,
}

impl AgentService {
    pub fn new(settings: Arc<Settings>, offload: Offload) -> ServiceResult<Self> {
        let sdk = Arc::new(HttpVoiceSdk::new(settings.elevenlabs_base_url.clone()));
        Self::with_sdk(settings, sdk, offload)
    }

    pub fn with_sdk(
        settings: Arc<Settings>,
        sdk: Arc<dyn VoiceSdk>,
        offload: Offload,
    ) -> ServiceResult<Self> {
        let platform = PlatformClient::new(settings.elevenlabs_base_url.clone())?;
        let llm = OpenAiClient::new(
            settings.openai_base_url.clone(),
            settings.openai_model.clone(),
        )?;

        Ok(Self {
            settings,
            platform,
            llm,
            sdk,
            offload,
        })
    }

    fn agent_id(&self, requested: Option<&str>) -> ServiceResult<String> {
        resolve_agent_id(requested, self.settings.elevenlabs_agent_id.as_deref())
    }

    fn platform_key(&self) -> ServiceResult<String> {
        require_credential(
            self.settings.elevenlabs_api_key.as_deref(),
            "ELEVENLABS_API_KEY",
        )
        .map(str::to_string)
    }

    fn llm_key(&self) -> ServiceResult<&str> {
        require_credential(self.settings.openai_api_key.as_deref(), "OPENAI_API_KEY")
    }

    pub async fn issue_conversation_token(
        &self,
        agent_id: Option<&str>,
    ) -> ServiceResult<ConversationToken> {
        let agent_id = self.agent_id(agent_id)?;
        let api_key = self.platform_key()?;

        debug!(%agent_id, "issuing conversation token");
        let sdk = Arc::clone(&self.sdk);
        let requested = agent_id.clone();
        let payload = self
            .offload
            .run(move || sdk.conversation_token(&api_key, &requested))
            .await?
            .map_err(|e| ServiceError::upstream(e.to_string()))?;

        match payload {
            Value::Object(map) => Ok(ConversationToken::from_payload(map, &agent_id)),
            other => Err(ServiceError::upstream(format!(
                "Unexpected ElevenLabs response: {}",
                json_kind(&other)
            ))),
        }
    }

    pub async fn fetch_prompt(&self, agent_id: Option<&str>) -> ServiceResult<PromptSnapshot> {
        let agent_id = self.agent_id(agent_id)?;
        let api_key = self.platform_key()?;

        let doc = self.platform.get_agent(&api_key, &agent_id).await?;
        let extracted = extract_prompt(&doc);
        Ok(PromptSnapshot {
            agent_id: extracted.agent_id.unwrap_or(agent_id),
            display_name: extracted.display_name,
            prompt: extracted.prompt,
            first_message: extracted.first_message,
        })
    }

    /// Replace the agent's prompt (and optionally first message), keeping the
    /// rest of its configuration as it was.
    pub async fn update_prompt(&self, update: &PromptUpdate) -> ServiceResult<PromptSnapshot> {
        let agent_id = self.agent_id(update.agent_id.as_deref())?;
        let api_key = self.platform_key()?;
        ensure_prompt_text(&update.prompt)?;

        let existing = self.platform.get_agent(&api_key, &agent_id).await?;
        let payload = build_update_payload(
            &existing,
            &update.prompt,
            update.first_message.as_deref(),
        )?;
        let updated = self
            .platform
            .patch_agent(&api_key, &agent_id, &payload)
            .await?;

        info!(%agent_id, "agent prompt updated");
        Ok(updated_snapshot(
            &updated,
            &agent_id,
            &update.prompt,
            update.first_message.as_deref(),
        ))
    }

    /// Ask the LLM for a rewritten prompt. Reads the current prompt first and
    /// writes nothing back.
    pub async fn suggest_prompt(
        &self,
        feedback: &str,
        agent_id: Option<&str>,
    ) -> ServiceResult<PromptSuggestion> {
        let current = self.fetch_prompt(agent_id).await?;

        if feedback.trim().is_empty() {
            warn!(agent_id = %current.agent_id, "rejecting empty prompt feedback");
            return Err(ServiceError::invalid_request("Feedback must not be empty"));
        }
        let llm_key = self.llm_key()?;

        let current_prompt = current.prompt.unwrap_or_default();
        let user_message = suggestion_message(&current_prompt, feedback);
        let suggested = self
            .llm
            .complete(llm_key, SUGGESTION_SYSTEM_PROMPT, &user_message)
            .await?;

        Ok(PromptSuggestion {
            agent_id: current.agent_id,
            display_name: current.display_name,
            current_prompt,
            suggested_prompt: suggested.trim().to_string(),
        })
    }

    pub async fn transcribe_audio(
        &self,
        request: &TranscriptionRequest,
    ) -> ServiceResult<Transcription> {
        let audio = decode_audio(&request.audio)?;
        let format = audio_format(&request.format)?;
        let api_key = self.platform_key()?;

        let model_id = non_blank(request.model_id.as_deref())
            .unwrap_or(&self.settings.stt_model)
            .to_string();
        let language_code = non_blank(request.language_code.as_deref()).map(str::to_string);
        let upload = SttUpload::new(audio, &format, model_id, language_code);

        debug!(
            file_name = %upload.file_name,
            bytes = upload.audio.len(),
            model = %upload.model_id,
            "submitting audio for transcription"
        );
        let sdk = Arc::clone(&self.sdk);
        let response = self
            .offload
            .run(move || sdk.speech_to_text(&api_key, upload))
            .await?
            .map_err(|e| ServiceError::upstream(e.to_string()))?;

        extract_transcript(&response)
            .map(|text| Transcription { text })
            .ok_or_else(|| ServiceError::upstream("ElevenLabs transcription returned no text"))
    }
}

fn suggestion_message(current_prompt: &str, feedback: &str) -> String {
    format!(
        "Current prompt:\n<<<PROMPT\n{}\nPROMPT>>>\n\n\
         Developer feedback:\n<<<FEEDBACK\n{}\nFEEDBACK>>>\n\n\
         Return the complete revised prompt.",
        current_prompt, feedback
    )
}

fn decode_audio(encoded: &str) -> ServiceResult<Vec<u8>> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(ServiceError::invalid_request("Audio payload is empty"));
    }

    let audio = STANDARD
        .decode(encoded)
        .map_err(|_| ServiceError::invalid_request("Audio payload is not valid base64"))?;
    if audio.is_empty() {
        return Err(ServiceError::invalid_request("Audio payload is empty"));
    }
    Ok(audio)
}

/// Normalise the declared container format. It ends up in a file name and a
/// MIME type, so only a plain token is accepted.
fn audio_format(format: &str) -> ServiceResult<String> {
    let format = format.trim().trim_start_matches('.').to_ascii_lowercase();
    if format.is_empty() {
        return Ok("webm".to_string());
    }
    if !format
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '+')
    {
        return Err(ServiceError::invalid_request(format!(
            "Unsupported audio format: {}",
            format
        )));
    }
    Ok(format)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::MockVoiceSdk;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(platform: &str, llm: &str) -> Settings {
        Settings {
            elevenlabs_api_key: Some("xi-test".to_string()),
            elevenlabs_agent_id: Some("agent_default".to_string()),
            elevenlabs_base_url: platform.to_string(),
            openai_api_key: Some("oa-test".to_string()),
            openai_base_url: llm.to_string(),
            ..Settings::default()
        }
    }

    fn service(settings: Settings, sdk: MockVoiceSdk) -> AgentService {
        AgentService::with_sdk(Arc::new(settings), Arc::new(sdk), Offload::new(4)).unwrap()
    }

    /// A server that fails the test on drop if it sees any request.
    async fn silent_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        server
    }

    fn agent_doc(prompt: &str) -> Value {
        json!({
            "agent_id": "agent_default",
            "display_name": "Front Desk",
            "conversation_config": {
                "agent": {"first_message": "Hello!", "prompt": {"prompt": prompt, "tone": "formal"}}
            }
        })
    }

    #[tokio::test]
    async fn test_token_adds_agent_id() {
        let sdk = MockVoiceSdk::new().with_token_response(json!({"token": "tok_1"}));
        let svc = service(settings("http://127.0.0.1:9", "http://127.0.0.1:9"), sdk.clone());

        let token = svc.issue_conversation_token(None).await.unwrap();
        assert_eq!(token.agent_id(), Some("agent_default"));
        assert_eq!(token.token(), Some("tok_1"));
        assert_eq!(*sdk.token_calls.lock().unwrap(), vec!["agent_default".to_string()]);
    }

    #[tokio::test]
    async fn test_token_requested_agent_overrides_default() {
        let sdk = MockVoiceSdk::new().with_token_response(json!({"token": "tok_1"}));
        let svc = service(settings("http://127.0.0.1:9", "http://127.0.0.1:9"), sdk.clone());

        let token = svc.issue_conversation_token(Some("agent_other")).await.unwrap();
        assert_eq!(token.agent_id(), Some("agent_other"));
    }

    #[tokio::test]
    async fn test_token_without_agent_never_calls_sdk() {
        let sdk = MockVoiceSdk::new().with_token_response(json!({"token": "tok_1"}));
        let mut cfg = settings("http://127.0.0.1:9", "http://127.0.0.1:9");
        cfg.elevenlabs_agent_id = None;
        let svc = service(cfg, sdk.clone());

        let err = svc.issue_conversation_token(Some("")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(sdk.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_without_key_is_not_configured() {
        let sdk = MockVoiceSdk::new().with_token_response(json!({"token": "tok_1"}));
        let mut cfg = settings("http://127.0.0.1:9", "http://127.0.0.1:9");
        cfg.elevenlabs_api_key = None;
        let svc = service(cfg, sdk.clone());

        let err = svc.issue_conversation_token(None).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "ELEVENLABS_API_KEY is not configured");
        assert_eq!(sdk.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_sdk_failure_is_bad_gateway() {
        let svc = service(
            settings("http://127.0.0.1:9", "http://127.0.0.1:9"),
            MockVoiceSdk::new(),
        );
        let err = svc.issue_conversation_token(None).await.unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.to_string(), "token endpoint unavailable");
    }

    #[tokio::test]
    async fn test_token_non_object_response_is_bad_gateway() {
        let sdk = MockVoiceSdk::new().with_token_response(json!("tok_1"));
        let svc = service(settings("http://127.0.0.1:9", "http://127.0.0.1:9"), sdk);
        let err = svc.issue_conversation_token(None).await.unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert!(err.to_string().contains("string"));
    }

    #[tokio::test]
    async fn test_transcribe_wav_names_upload() {
        let sdk = MockVoiceSdk::new().with_stt_response(json!({"text": "  make it friendlier "}));
        let svc = service(settings("http://127.0.0.1:9", "http://127.0.0.1:9"), sdk.clone());

        let request =
            TranscriptionRequest::new(STANDARD.encode(b"RIFF....WAVE")).with_format("wav");
        let result = svc.transcribe_audio(&request).await.unwrap();
        assert_eq!(result.text, "make it friendlier");

        let calls = sdk.stt_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].file_name, "feedback.wav");
        assert_eq!(calls[0].mime_type, "audio/wav");
        assert_eq!(calls[0].model_id, "scribe_v1");
        assert_eq!(calls[0].audio, b"RIFF....WAVE".to_vec());
        assert_eq!(calls[0].language_code, None);
    }

    #[tokio::test]
    async fn test_transcribe_overrides_model_and_language() {
        let sdk = MockVoiceSdk::new().with_stt_response(json!({"transcription": "hola"}));
        let svc = service(settings("http://127.0.0.1:9", "http://127.0.0.1:9"), sdk.clone());

        let mut request = TranscriptionRequest::new(STANDARD.encode(b"webm-bytes"));
        request.model_id = Some("scribe_v2".to_string());
        request.language_code = Some("es".to_string());
        let result = svc.transcribe_audio(&request).await.unwrap();
        assert_eq!(result.text, "hola");

        let calls = sdk.stt_calls.lock().unwrap();
        assert_eq!(calls[0].file_name, "feedback.webm");
        assert_eq!(calls[0].model_id, "scribe_v2");
        assert_eq!(calls[0].language_code.as_deref(), Some("es"));
    }

    #[tokio::test]
    async fn test_transcribe_rejects_bad_audio_before_dispatch() {
        let sdk = MockVoiceSdk::new().with_stt_response(json!({"text": "hi"}));
        let svc = service(settings("http://127.0.0.1:9", "http://127.0.0.1:9"), sdk.clone());

        for audio in ["", "   ", "not base64 !!", "===="] {
            let err = svc
                .transcribe_audio(&TranscriptionRequest::new(audio))
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 400, "audio {:?}", audio);
        }

        let request = TranscriptionRequest::new(STANDARD.encode(b"abc")).with_format("../wav");
        let err = svc.transcribe_audio(&request).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        assert_eq!(sdk.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transcribe_blank_text_is_bad_gateway() {
        let sdk = MockVoiceSdk::new().with_stt_response(json!({"text": "  "}));
        let svc = service(settings("http://127.0.0.1:9", "http://127.0.0.1:9"), sdk);

        let err = svc
            .transcribe_audio(&TranscriptionRequest::new(STANDARD.encode(b"abc")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.to_string(), "ElevenLabs transcription returned no text");
    }

    #[tokio::test]
    async fn test_missing_agent_makes_no_network_calls() {
        let platform = silent_server().await;
        let llm = silent_server().await;
        let sdk = MockVoiceSdk::new();
        let mut cfg = settings(&platform.uri(), &llm.uri());
        cfg.elevenlabs_agent_id = None;
        let svc = service(cfg, sdk.clone());

        let errors = vec![
            svc.issue_conversation_token(None).await.unwrap_err(),
            svc.fetch_prompt(None).await.unwrap_err(),
            svc.update_prompt(&PromptUpdate {
                prompt: "new".to_string(),
                ..PromptUpdate::default()
            })
            .await
            .unwrap_err(),
            svc.suggest_prompt("be warmer", Some("  ")).await.unwrap_err(),
        ];
        for err in errors {
            assert!(matches!(err, ServiceError::InvalidRequest(_)));
        }
        assert_eq!(sdk.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_prompt() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/convai/agents/agent_default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(agent_doc("Be helpful.")))
            .expect(1)
            .mount(&platform)
            .await;
        let svc = service(settings(&platform.uri(), "http://127.0.0.1:9"), MockVoiceSdk::new());

        let snapshot = svc.fetch_prompt(None).await.unwrap();
        assert_eq!(
            snapshot,
            PromptSnapshot {
                agent_id: "agent_default".to_string(),
                display_name: Some("Front Desk".to_string()),
                prompt: Some("Be helpful.".to_string()),
                first_message: Some("Hello!".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_prompt_surfaces_rate_limit() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"detail": "too_many_requests"})),
            )
            .mount(&platform)
            .await;
        let svc = service(settings(&platform.uri(), "http://127.0.0.1:9"), MockVoiceSdk::new());

        let err = svc.fetch_prompt(None).await.unwrap_err();
        assert_eq!(err.status_code(), 429);
        assert!(err.to_string().contains("too_many_requests"));
    }

    #[tokio::test]
    async fn test_update_rejects_blank_prompt_before_network() {
        let platform = silent_server().await;
        let svc = service(settings(&platform.uri(), "http://127.0.0.1:9"), MockVoiceSdk::new());

        let err = svc
            .update_prompt(&PromptUpdate {
                prompt: "  ".to_string(),
                ..PromptUpdate::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_update_falls_back_to_sent_values() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(agent_doc("old")))
            .mount(&platform)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&platform)
            .await;
        let svc = service(settings(&platform.uri(), "http://127.0.0.1:9"), MockVoiceSdk::new());

        let snapshot = svc
            .update_prompt(&PromptUpdate {
                prompt: "new".to_string(),
                first_message: Some("Hey".to_string()),
                agent_id: Some("agent_x".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(snapshot.agent_id, "agent_x");
        assert_eq!(snapshot.prompt.as_deref(), Some("new"));
        assert_eq!(snapshot.first_message.as_deref(), Some("Hey"));
        assert_eq!(snapshot.display_name, None);
    }

    #[tokio::test]
    async fn test_suggest_prompt() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(agent_doc("Be helpful.")))
            .mount(&platform)
            .await;
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "\n Be helpful and warm.\n"}
                }]
            })))
            .expect(1)
            .mount(&llm)
            .await;
        let svc = service(settings(&platform.uri(), &llm.uri()), MockVoiceSdk::new());

        let suggestion = svc.suggest_prompt("Sound warmer", None).await.unwrap();
        assert_eq!(suggestion.agent_id, "agent_default");
        assert_eq!(suggestion.current_prompt, "Be helpful.");
        assert_eq!(suggestion.suggested_prompt, "Be helpful and warm.");

        let requests = llm.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("<<<PROMPT\nBe helpful.\nPROMPT>>>"));
        assert!(user.contains("<<<FEEDBACK\nSound warmer\nFEEDBACK>>>"));
        assert_eq!(body["messages"][0]["content"], SUGGESTION_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_suggest_empty_feedback_never_calls_llm() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(agent_doc("Be helpful.")))
            .mount(&platform)
            .await;
        let llm = silent_server().await;
        let svc = service(settings(&platform.uri(), &llm.uri()), MockVoiceSdk::new());

        let err = svc.suggest_prompt(" \n", None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_suggest_reports_platform_key_before_llm_key() {
        let platform = silent_server().await;
        let llm = silent_server().await;
        let mut cfg = settings(&platform.uri(), &llm.uri());
        cfg.elevenlabs_api_key = None;
        cfg.openai_api_key = None;
        let svc = service(cfg, MockVoiceSdk::new());

        let err = svc.suggest_prompt("warmer", None).await.unwrap_err();
        assert_eq!(err.to_string(), "ELEVENLABS_API_KEY is not configured");
    }

    #[tokio::test]
    async fn test_suggest_without_llm_key() {
        let platform = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(agent_doc("Be helpful.")))
            .expect(1)
            .mount(&platform)
            .await;
        let llm = silent_server().await;
        let mut cfg = settings(&platform.uri(), &llm.uri());
        cfg.openai_api_key = None;
        let svc = service(cfg, MockVoiceSdk::new());

        let err = svc.suggest_prompt("warmer", None).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "OPENAI_API_KEY is not configured");
    }

    #[test]
    fn test_audio_format_normalisation() {
        assert_eq!(audio_format(" .WAV ").unwrap(), "wav");
        assert_eq!(audio_format("").unwrap(), "webm");
        assert!(audio_format("wav; charset=x").is_err());
    }
}
