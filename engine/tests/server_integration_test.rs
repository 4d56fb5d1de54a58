//! Integration tests for the HTTP front end, driven through the router
//! without binding a socket

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

use kiln_engine::agent::{ConversationStore, Orchestrator, ReferenceResolver};
use kiln_engine::config::Config;
use kiln_engine::llm::{LLMProvider, OllamaProvider};
use kiln_engine::secrets::SecretCache;
use kiln_engine::server::{router, ServerState};
use kiln_engine::tools::{ToolRegistry, Toolbox};

struct Harness {
    _temp_dir: TempDir,
    config: Config,
    app: Router,
}

async fn harness(server: &MockServer) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::for_workspace(temp_dir.path()).unwrap();
    config.llm.default_provider = "ollama".to_string();
    config.llm.ollama.base_url = server.uri();

    let provider: Arc<dyn LLMProvider> =
        Arc::new(OllamaProvider::new(server.uri(), "llama3.1:8b").unwrap());
    let tools = Arc::new(ToolRegistry::new(
        &config,
        Arc::clone(&provider),
        SecretCache::with_values([("unused", "")]),
    ));
    let orchestrator = Orchestrator::new(
        Arc::clone(&provider),
        Arc::clone(&tools) as Arc<dyn Toolbox>,
        ConversationStore::in_memory(),
        ReferenceResolver::new(config.projects_dir()),
    )
    .shared();

    let app = router(ServerState {
        orchestrator,
        tools,
        provider,
    });

    Harness {
        _temp_dir: temp_dir,
        config,
        app,
    }
}

async fn reply_to(server: &MockServer, marker: &str, reply: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": reply,
            "done": true
        })))
        .mount(server)
        .await;
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_status_reports_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;
    let harness = harness(&server).await;

    let request = Request::builder()
        .uri("/api/status")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&harness.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "ollama");
    assert_eq!(body["provider_healthy"], true);
    assert_eq!(body["conversation_turns"], 0);
}

#[tokio::test]
async fn test_empty_prompt_is_bad_request() {
    let server = MockServer::start().await;
    let harness = harness(&server).await;

    for uri in ["/", "/agent"] {
        let (status, body) = call(&harness.app, post(uri, json!({"prompt": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "prompt is required");
    }
}

#[tokio::test]
async fn test_generate_endpoint_builds_project() {
    let server = MockServer::start().await;
    reply_to(
        &server,
        "Generate ONLY valid JSON",
        r#"{"files": {"index.html": "<h1>hi</h1>"}, "main_file": "index.html"}"#,
    )
    .await;
    let harness = harness(&server).await;

    let (status, body) = call(
        &harness.app,
        post("/", json!({"prompt": "a landing page", "auto_run": false})),
    )
    .await;

    let project_dir = harness.config.projects_dir().join("project_1");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project generated successfully");
    assert_eq!(body["project_dir"], project_dir.display().to_string());
    assert_eq!(body["main_file"], "index.html");
    assert!(body["run_output"].is_null());
    assert!(project_dir.join("index.html").is_file());
}

#[tokio::test]
async fn test_generate_endpoint_reports_failure() {
    let server = MockServer::start().await;
    reply_to(&server, "Generate ONLY valid JSON", "I cannot do that.").await;
    let harness = harness(&server).await;

    let (status, body) = call(&harness.app, post("/", json!({"prompt": "anything"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("("));
}

#[tokio::test]
async fn test_agent_endpoint_dispatches_and_records() {
    let server = MockServer::start().await;
    reply_to(
        &server,
        "Decide which ONE action",
        r#"{"action": "edit_file", "args": {"file_path": "nowhere.py", "modification_prompt": "x"}}"#,
    )
    .await;
    let harness = harness(&server).await;

    let (status, body) = call(
        &harness.app,
        post("/agent", json!({"prompt": "fix nowhere.py"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "edit_file");
    assert_eq!(body["fallback"], false);
    assert!(body["text"]
        .as_str()
        .unwrap()
        .starts_with("ERROR: File not found: 'nowhere.py'."));
    assert_eq!(body["result"]["type"], "text");
}
