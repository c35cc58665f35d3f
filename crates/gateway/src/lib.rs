//! HTTP API gateway for reagent.
//!
//! A thin transport over [`ReactAgent::execute`]:
//!
//! - `POST /api/agent` with `{"query": "...", "conversation": [...]}`
//! - `GET /health`
//!
//! The agent is built once at startup and shared; every request gets its
//! own transcript, so concurrent requests never see each other's state.

use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use reagent_agent::ReactAgent;
use reagent_config::{AppConfig, GatewayConfig};
use reagent_core::{ConversationTurn, ProviderError, TraceEntry, TurnRole};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<ReactAgent>,
}

type SharedState = Arc<GatewayState>;

/// Gateway startup errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Model provider unavailable: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to bind or serve: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit from `gateway.max_body_bytes`
/// - CORS for `gateway.allowed_origins` (none when empty)
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/agent", post(agent_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes));

    if let Some(cors) = cors_layer(&config.allowed_origins) {
        router = router.layer(cors);
    }

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600)),
    )
}

/// Start the gateway HTTP server.
///
/// Builds the provider, tools and agent once and shares them across
/// requests.
pub async fn start(config: AppConfig) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = reagent_providers::build_from_config(&config)?;
    let tools = Arc::new(reagent_tools::default_registry(&config.tools));
    let agent = Arc::new(ReactAgent::from_config(provider, tools, &config.agent));

    let app = build_router(Arc::new(GatewayState { agent }), &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
struct AgentRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    conversation: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
struct AgentResponse {
    final_answer: String,
    trace: Vec<TraceEntry>,
    converged: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

/// An error response: status plus `{"error": ..., "kind"?: ...}`.
struct ApiError {
    status: StatusCode,
    message: String,
    kind: Option<&'static str>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            kind: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<reagent_core::Error> for ApiError {
    fn from(err: reagent_core::Error) -> Self {
        match err {
            reagent_core::Error::Provider(e) => Self {
                status: StatusCode::BAD_GATEWAY,
                message: e.to_string(),
                kind: Some("model_unavailable"),
            },
        }
    }
}

/// Chat clients append the current message to the history before posting
/// it; the query is seeded separately, so drop that echo.
fn prior_turns<'a>(conversation: &'a [ConversationTurn], query: &str) -> &'a [ConversationTurn] {
    match conversation.split_last() {
        Some((last, rest)) if last.role == TurnRole::User && last.content.trim() == query => rest,
        _ => conversation,
    }
}

async fn agent_handler(
    State(state): State<SharedState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> Result<Json<AgentResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected agent request body");
        ApiError::bad_request(rejection.body_text())
    })?;

    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query is required"))?;

    let prior = prior_turns(&request.conversation, query);
    info!(
        query_len = query.len(),
        prior_turns = prior.len(),
        "Agent request received"
    );

    match state.agent.execute(query, prior).await {
        Ok(result) => Ok(Json(AgentResponse {
            final_answer: result.final_answer,
            trace: result.trace,
            converged: result.converged,
        })),
        Err(e) => {
            error!(error = %e, "Agent run failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use reagent_core::{Provider, ToolRegistry};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replays canned replies and records the prompts it saw.
    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Self {
            let mut responses: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ProviderError::Network("script exhausted".into()))
        }
    }

    fn app_with(provider: Arc<ScriptedProvider>) -> Router {
        let mut tools = ToolRegistry::new();
        tools.register_fn("search", "Search for facts", |_| Ok("330 meters".into()));
        let agent = Arc::new(ReactAgent::new(provider, Arc::new(tools)));
        build_router(Arc::new(GatewayState { agent }), &GatewayConfig::default())
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/agent")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = app_with(Arc::new(ScriptedProvider::new(&[])));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn agent_returns_answer_and_trace() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "Thought: look it up\nAction: search\nAction Input: Eiffel Tower height",
            "Final Answer: 330 meters",
        ]));
        let response = app_with(provider)
            .oneshot(post_json(r#"{"query": "How tall is the Eiffel Tower?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["final_answer"], "330 meters");
        assert_eq!(body["converged"], true);

        let trace = body["trace"].as_array().unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0]["kind"], "action");
        assert_eq!(trace[0]["content"]["tool"], "search");
        assert_eq!(trace[1]["kind"], "observation");
        assert_eq!(trace[1]["content"], "330 meters");
        assert_eq!(trace[2]["kind"], "final_answer");
        assert_eq!(trace[2]["index"], 3);
    }

    #[tokio::test]
    async fn conversation_is_forwarded() {
        let provider = Arc::new(ScriptedProvider::new(&["Final Answer: 1920"]));
        let response = app_with(provider.clone())
            .oneshot(post_json(
                r#"{"query": "When was he born?", "conversation": [
                    {"role": "user", "content": "Who wrote Dune?"},
                    {"role": "assistant", "content": "Frank Herbert."}
                ]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let prompt = provider.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("User: Who wrote Dune?"));
        assert!(prompt.contains("Assistant: Frank Herbert."));
    }

    #[tokio::test]
    async fn trailing_copy_of_query_is_not_repeated() {
        let provider = Arc::new(ScriptedProvider::new(&["Final Answer: 1920"]));
        let response = app_with(provider.clone())
            .oneshot(post_json(
                r#"{"query": "When was he born?", "conversation": [
                    {"role": "user", "content": "Who wrote Dune?"},
                    {"role": "assistant", "content": "Frank Herbert."},
                    {"role": "user", "content": "When was he born?"}
                ]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let prompt = provider.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("User: Who wrote Dune?"));
        assert!(!prompt.contains("User: When was he born?"));
        assert_eq!(prompt.matches("When was he born?").count(), 1);
    }

    #[test]
    fn earlier_repeats_of_the_query_are_kept() {
        let conversation = vec![
            ConversationTurn::user("ping"),
            ConversationTurn::assistant("pong"),
        ];
        assert_eq!(prior_turns(&conversation, "ping").len(), 2);
        assert!(prior_turns(&[], "ping").is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        for body in [r#"{"query": "   "}"#, r#"{}"#] {
            let response = app_with(Arc::new(ScriptedProvider::new(&[])))
                .oneshot(post_json(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = json_body(response).await;
            assert_eq!(json["error"], "Query is required");
        }
    }

    #[tokio::test]
    async fn invalid_json_is_bad_request() {
        let response = app_with(Arc::new(ScriptedProvider::new(&[])))
            .oneshot(post_json("{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn model_failure_is_bad_gateway() {
        let response = app_with(Arc::new(ScriptedProvider::new(&[])))
            .oneshot(post_json(r#"{"query": "capital of France"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "model_unavailable");
        assert!(body["error"].as_str().unwrap().contains("script exhausted"));
    }

    #[test]
    fn cors_layer_only_with_valid_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["http://localhost:8501".into()]).is_some());
        assert!(cors_layer(&["bad\norigin".into()]).is_none());
    }
}
