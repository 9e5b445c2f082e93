use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lundo_core::store::{CONNECT_FAILED_MESSAGE, CONNECT_RETRY_MESSAGE};
use lundo_core::{ChatError, ChatMode, ChatRequest, ChatStore, ChatTransport, Message, RagClient, SendOutcome};
use serde_json::{json, Value};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{}", addr)
}

fn request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        conversation_history: vec![Message::user("earlier"), Message::assistant("reply")],
    }
}

#[tokio::test]
async fn healthy_backend_reports_quota() {
    let router = Router::new().route(
        "/api/health",
        get(|| async {
            (
                [
                    ("X-RateLimit-Limit", "60"),
                    ("X-RateLimit-Remaining", "59"),
                    ("X-RateLimit-Reset", "1700000000"),
                ],
                Json(json!({"status": "healthy", "version": "2.0.0"})),
            )
        }),
    );
    let client = RagClient::new(&serve(router).await);

    let reply = client.health().await.expect("health");

    assert!(reply.body.is_healthy());
    let quota = reply.rate_limit.expect("quota headers");
    assert_eq!(quota.limit, 60);
    assert_eq!(quota.remaining, 59);
    assert_eq!(quota.retry_after, None);
}

#[tokio::test]
async fn unhealthy_503_is_a_request_failure() {
    let router = Router::new().route(
        "/api/health",
        get(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "message": "Service not fully configured"})),
            )
        }),
    );
    let store = ChatStore::new(RagClient::new(&serve(router).await));

    store.check_health().await;

    let state = store.snapshot();
    assert!(!state.is_ready);
    assert!(!state.is_checking_health);
    assert_eq!(state.error.as_deref(), Some(CONNECT_FAILED_MESSAGE));
}

#[tokio::test]
async fn chat_sends_message_and_history() {
    let router = Router::new().route(
        "/api/chat",
        post(|Json(body): Json<Value>| async move {
            let history = body["conversation_history"].as_array().map(Vec::len).unwrap_or(0);
            Json(json!({
                "answer": format!("{} ({} earlier)", body["message"].as_str().unwrap_or(""), history),
                "citations": [{"title": "Resume", "content": "...", "url": "https://example.com/cv"}],
                "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
            }))
        }),
    );
    let client = RagClient::new(&serve(router).await);

    let reply = client.chat(&request("hello")).await.expect("chat");

    assert_eq!(reply.body.answer, "hello (2 earlier)");
    assert_eq!(reply.body.citations[0].url.as_deref(), Some("https://example.com/cv"));
    assert_eq!(reply.body.usage.map(|u| u.total_tokens), Some(3));
    assert!(reply.rate_limit.is_none());
}

#[tokio::test]
async fn chat_429_reads_retry_after() {
    let router = Router::new().route(
        "/api/chat",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", "30")],
                Json(json!({"error": "Rate limit exceeded. Please try again later."})),
            )
        }),
    );
    let store = ChatStore::new(RagClient::new(&serve(router).await));
    store.set_mode(ChatMode::Simple);

    let outcome = store.send_message("hi").await;

    let state = store.snapshot();
    assert_eq!(outcome, SendOutcome::Failed);
    assert!(state.is_rate_limited);
    assert!(state.error.expect("error").contains("30 seconds"));
    assert!(state.messages.is_empty());
}

#[tokio::test]
async fn chat_429_without_retry_after_waits_sixty() {
    let router = Router::new().route("/api/chat", post(|| async { StatusCode::TOO_MANY_REQUESTS }));
    let client = RagClient::new(&serve(router).await);

    match client.chat(&request("hi")).await {
        Err(ChatError::RateLimited { retry_after, .. }) => assert_eq!(retry_after, 60),
        other => panic!("expected rate limit, got {:?}", other.map(|r| r.body)),
    }
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let router = Router::new()
        .route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Model overloaded"})),
                )
            }),
        )
        .route(
            "/api/agent-stream",
            post(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
        );
    let client = RagClient::new(&serve(router).await);

    let err = client.chat(&request("hi")).await.expect_err("chat should fail");
    assert_eq!(err.to_string(), "Model overloaded");

    let err = client.agent_stream(&request("hi")).await.expect_err("agent should fail");
    assert!(matches!(err, ChatError::Request { status: 502, .. }));
    assert_eq!(err.to_string(), "Request failed: 502");
}

#[tokio::test]
async fn agent_stream_turn_through_store() {
    let router = Router::new().route(
        "/api/agent-stream",
        post(|| async {
            Json(json!({"events": [
                {"type": "status", "tool": "RAG-search_documents", "message": "Document search complete"},
                {"type": "status", "tool": "AboutMe-get_profile", "message": "Profile loaded"},
                {"type": "response", "answer": "He builds data platforms.",
                 "tool_calls": [], "citations": [{"title": "CV", "content": "..."}]}
            ]}))
        }),
    );
    let store = ChatStore::new(RagClient::new(&serve(router).await));

    assert_eq!(store.send_message("What does he do?").await, SendOutcome::Sent);

    let state = store.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].content, "He builds data platforms.");
    assert_eq!(state.citations.len(), 1);
    assert!(!state.agent_status.is_thinking);
}

#[tokio::test]
async fn agent_error_event_fails_the_turn() {
    let router = Router::new().route(
        "/api/agent-stream",
        post(|| async { Json(json!({"events": [{"type": "error", "error": "Agent module not available"}]})) }),
    );
    let store = ChatStore::new(RagClient::new(&serve(router).await));

    assert_eq!(store.send_message("hi").await, SendOutcome::Failed);

    let state = store.snapshot();
    assert!(state.messages.is_empty());
    assert_eq!(state.error.as_deref(), Some("Agent module not available"));
}

#[tokio::test]
async fn unreachable_server_is_a_connectivity_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let client = RagClient::new(&format!("http://{}", addr));

    let err = client.chat(&request("hi")).await.expect_err("no server");
    assert!(err.is_connectivity());

    let store = ChatStore::new(client);
    store.check_health().await;
    assert_eq!(store.snapshot().error.as_deref(), Some(CONNECT_RETRY_MESSAGE));
}

#[tokio::test]
async fn search_returns_results() {
    let router = Router::new().route(
        "/api/search",
        post(|Json(body): Json<Value>| async move {
            Json(json!({"results": [
                {"title": body["query"], "content": "match", "url": "https://example.com", "score": 0.8}
            ]}))
        }),
    );
    let client = RagClient::new(&serve(router).await);

    let reply = client.search("kubernetes").await.expect("search");

    assert_eq!(reply.body.results.len(), 1);
    assert_eq!(reply.body.results[0].title, "kubernetes");
}

#[tokio::test]
async fn null_citations_and_answer_are_accepted() {
    let router = Router::new().route(
        "/api/chat",
        post(|Json(body): Json<Value>| async move {
            if body["message"] == "blank" {
                Json(json!({"answer": null, "citations": null, "tool_calls": null}))
            } else {
                Json(json!({"answer": "hi", "citations": null}))
            }
        }),
    );
    let store = ChatStore::new(RagClient::new(&serve(router).await));
    store.set_mode(ChatMode::Simple);

    assert_eq!(store.send_message("hello").await, SendOutcome::Sent);
    let state = store.snapshot();
    assert_eq!(state.messages[1].content, "hi");
    assert!(state.citations.is_empty());
    assert_eq!(state.error, None);

    assert_eq!(store.send_message("blank").await, SendOutcome::Sent);
    assert_eq!(store.snapshot().messages[3].content, "");
}

#[tokio::test]
async fn null_agent_events_are_an_empty_turn() {
    let router = Router::new().route(
        "/api/agent-stream",
        post(|| async { Json(json!({"events": null})) }),
    );
    let store = ChatStore::new(RagClient::new(&serve(router).await));

    assert_eq!(store.send_message("hi").await, SendOutcome::Sent);

    let state = store.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].content, "");
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn agent_turn_hands_back_every_tool_call() {
    let router = Router::new().route(
        "/api/agent-stream",
        post(|| async {
            Json(json!({"events": [
                {"type": "status", "tool": "RAG-search_documents", "message": "Document search complete"},
                {"type": "status", "tool": "WebSearch-search_web", "message": "Web search complete"},
                {"type": "response", "answer": "Found it.", "citations": null}
            ]}))
        }),
    );
    let store = ChatStore::new(RagClient::new(&serve(router).await));

    for _ in 0..20 {
        store.clear_chat();
        let turn = store.send_turn("where?").await.expect("turn");
        let tools: Vec<_> = turn.tool_calls.iter().map(|call| call.tool.as_str()).collect();
        assert_eq!(tools, vec!["RAG-search_documents", "WebSearch-search_web"]);
    }
}
