//! HTTP chat API for integration with other front ends.
//!
//! Sessions live in memory for the server's lifetime; their conversations are
//! stored by the configured checkpointer and can be reopened by id.

use crate::agent::ChatSettings;
use crate::chat::{ChatService, SessionStore, TurnOutcome};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::CoraError;
use crate::llm::ModelChoice;
use crate::message::Role;
use crate::transcription::AudioClip;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Whisper rejects uploads above 25 MB.
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
pub(crate) struct AppState {
    service: ChatService,
    sessions: SessionStore,
    settings: Settings,
}

impl AppState {
    pub(crate) fn new(service: ChatService, settings: Settings) -> Self {
        Self {
            service,
            sessions: SessionStore::from_settings(&settings.server),
            settings,
        }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let service = ChatService::from_settings(&settings)?;
    let app = router(Arc::new(AppState::new(service, settings)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Cora API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Models", "GET    /models");
    Output::kv("New session", "POST   /sessions");
    Output::kv("History", "GET    /sessions/{id}/history");
    Output::kv("Send message", "POST   /sessions/{id}/messages");
    Output::kv("Send voice", "POST   /sessions/{id}/voice?file_name=clip.webm");
    Output::kv("Reset session", "DELETE /sessions/{id}");
    Output::kv("Transcribe", "POST   /transcribe?file_name=clip.webm");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/models", get(models))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/history", get(history))
        .route("/sessions/{id}/messages", post(send_message))
        .route("/sessions/{id}/voice", post(send_voice))
        .route("/transcribe", post(transcribe))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

/// Per-request overrides of the configured chat defaults.
#[derive(Debug, Default, Deserialize)]
struct ChatOptions {
    #[serde(default)]
    llm: Option<String>,
    #[serde(default)]
    search_web: Option<bool>,
    #[serde(default)]
    prompt_engineer: Option<bool>,
}

impl ChatOptions {
    fn resolve(&self, settings: &Settings) -> ChatSettings {
        let mut chat = ChatSettings::from_settings(settings);
        if let Some(llm) = &self.llm {
            chat.llm = llm.clone();
        }
        if let Some(search_web) = self.search_web {
            chat.search_web = search_web;
        }
        if let Some(prompt_engineer) = self.prompt_engineer {
            chat.prompt_engineer = prompt_engineer;
        }
        chat
    }
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
    #[serde(flatten)]
    options: ChatOptions,
}

/// Query string for raw audio uploads.
#[derive(Deserialize)]
struct VoiceQuery {
    #[serde(default = "default_file_name")]
    file_name: String,
    #[serde(default)]
    llm: Option<String>,
    #[serde(default)]
    search_web: Option<bool>,
    #[serde(default)]
    prompt_engineer: Option<bool>,
}

impl VoiceQuery {
    fn options(&self) -> ChatOptions {
        ChatOptions {
            llm: self.llm.clone(),
            search_web: self.search_web,
            prompt_engineer: self.prompt_engineer,
        }
    }
}

fn default_file_name() -> String {
    "audio.webm".to_string()
}

#[derive(Serialize)]
struct ModelInfo {
    name: &'static str,
    provider: String,
    model: String,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Serialize)]
struct HistoryEntry {
    role: Role,
    content: String,
}

#[derive(Serialize)]
struct HistoryResponse {
    session_id: String,
    messages: Vec<HistoryEntry>,
}

#[derive(Serialize)]
struct TurnResponse {
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<String>,
    #[serde(flatten)]
    outcome: Option<TurnOutcome>,
}

#[derive(Serialize)]
struct TranscribeResponse {
    text: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Library errors rendered as JSON.
struct ApiError(CoraError);

impl From<CoraError> for ApiError {
    fn from(e: CoraError) -> Self {
        Self(e)
    }
}

fn status_for(e: &CoraError) -> StatusCode {
    match e {
        CoraError::UnknownModel(_) | CoraError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoraError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelInfo>> {
    Json(
        ModelChoice::ALL
            .iter()
            .map(|choice| ModelInfo {
                name: choice.display_name(),
                provider: choice.provider().to_string(),
                model: choice.model_id(&state.settings.models).to_string(),
            })
            .collect(),
    )
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionResponse>) {
    let (session_id, _) = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

async fn history(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<HistoryResponse> {
    let checkpointer = state.service.agents().checkpointer();
    let handle = state.sessions.get_or_restore(&id, checkpointer.as_ref()).await?;
    let session = handle.lock().await;

    Ok(Json(HistoryResponse {
        session_id: session.id.clone(),
        messages: session
            .history
            .iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.text(),
            })
            .collect(),
    }))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<TurnResponse> {
    let chat = req.options.resolve(&state.settings);
    let checkpointer = state.service.agents().checkpointer();
    let handle = state.sessions.get_or_restore(&id, checkpointer.as_ref()).await?;
    let mut session = handle.lock().await;

    let outcome = state.service.submit(&mut session, &chat, &req.message, |_| {}).await?;

    Ok(Json(TurnResponse {
        session_id: id,
        transcript: None,
        outcome,
    }))
}

async fn send_voice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<VoiceQuery>,
    body: Bytes,
) -> ApiResult<TurnResponse> {
    let chat = query.options().resolve(&state.settings);
    let checkpointer = state.service.agents().checkpointer();
    let handle = state.sessions.get_or_restore(&id, checkpointer.as_ref()).await?;
    let mut session = handle.lock().await;

    let clip = AudioClip::new(query.file_name, body.to_vec());
    let (transcript, outcome) = state
        .service
        .submit_voice(&mut session, &chat, &clip, |_| {})
        .await?;

    Ok(Json(TurnResponse {
        session_id: id,
        transcript: Some(transcript),
        outcome,
    }))
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let loaded = state.sessions.remove(&id).await;
    let stored = state.service.agents().checkpointer().delete(&id).await?;

    if loaded || stored {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CoraError::SessionNotFound(id).into())
    }
}

async fn transcribe(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoiceQuery>,
    body: Bytes,
) -> ApiResult<TranscribeResponse> {
    let clip = AudioClip::new(query.file_name, body.to_vec());
    let text = state.service.transcribe(&clip).await?;
    Ok(Json(TranscribeResponse { text }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::HostedAgentFactory;
    use crate::config::Prompts;
    use crate::memory::MemorySaver;
    use serde_json::{json, Value};

    async fn spawn_app() -> String {
        let settings = Settings::default();
        let factory = HostedAgentFactory::new(settings.clone(), Prompts::default(), Arc::new(MemorySaver::new()));
        let state = Arc::new(AppState::new(ChatService::new(Arc::new(factory)), settings));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&CoraError::UnknownModel("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&CoraError::SessionNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&CoraError::Provider("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_chat_options_override_defaults() {
        let options: ChatOptions = serde_json::from_value(json!({"llm": "Grok", "search_web": true})).unwrap();
        let chat = options.resolve(&Settings::default());
        assert_eq!(chat.llm, "Grok");
        assert!(chat.search_web);
        assert!(!chat.prompt_engineer);
    }

    #[tokio::test]
    async fn test_session_lifecycle_over_http() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let health: Value = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
        assert_eq!(health["status"], "ok");

        let models: Value = client.get(format!("{}/models", base)).send().await.unwrap().json().await.unwrap();
        assert_eq!(models.as_array().unwrap().len(), 3);

        let created = client.post(format!("{}/sessions", base)).send().await.unwrap();
        assert_eq!(created.status(), 201);
        let id = created.json::<Value>().await.unwrap()["session_id"].as_str().unwrap().to_string();

        let blank: Value = client
            .post(format!("{}/sessions/{}/messages", base, id))
            .json(&json!({"message": "   "}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(blank["session_id"], id.as_str());
        assert!(blank.get("rendered").is_none());

        let unknown = client
            .post(format!("{}/sessions/{}/messages", base, id))
            .json(&json!({"message": "hi", "llm": "GPT-2"}))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), 400);
        assert_eq!(unknown.json::<Value>().await.unwrap()["error"], "Unknown LLM: GPT-2");

        let history: Value = client
            .get(format!("{}/sessions/{}/history", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history["messages"].as_array().unwrap().len(), 0);

        let deleted = client.delete(format!("{}/sessions/{}", base, id)).send().await.unwrap();
        assert_eq!(deleted.status(), 204);

        let missing = client.get(format!("{}/sessions/{}/history", base, id)).send().await.unwrap();
        assert_eq!(missing.status(), 404);
    }
}
