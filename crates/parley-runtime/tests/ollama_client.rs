//! End-to-end tests for `OllamaChatClient` against an in-process fake server.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use futures_util::StreamExt;
use parley_core::{ChatDelta, ChatMessage, ChatRequest, ChatTransport, TransportError};
use parley_runtime::OllamaChatClient;
use serde_json::Value;
use tokio::net::TcpListener;

/// Chunks written by the fake server, sent as separate body frames.
#[derive(Clone)]
struct Script {
    status: StatusCode,
    chunks: Vec<String>,
    seen: Arc<Mutex<Option<Value>>>,
}

async fn chat(State(script): State<Script>, Json(body): Json<Value>) -> Response {
    *script.seen.lock().unwrap() = Some(body);

    if !script.status.is_success() {
        return (script.status, script.chunks.concat()).into_response();
    }

    let frames = futures_util::stream::iter(
        script
            .chunks
            .into_iter()
            .map(Ok::<_, std::io::Error>),
    );
    Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(frames))
        .unwrap()
}

/// Start a fake server and return its base URL plus the captured request body.
async fn serve(status: StatusCode, chunks: &[&str]) -> (String, Arc<Mutex<Option<Value>>>) {
    let seen = Arc::new(Mutex::new(None));
    let script = Script {
        status,
        chunks: chunks.iter().map(|c| (*c).to_string()).collect(),
        seen: Arc::clone(&seen),
    };
    let app = Router::new()
        .route("/api/chat", post(chat))
        .with_state(script);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), seen)
}

fn frame(content: &str, done: bool) -> String {
    serde_json::json!({
        "model": "openchat",
        "created_at": "2024-01-01T00:00:00Z",
        "message": {"role": "assistant", "content": content},
        "done": done
    })
    .to_string()
        + "\n"
}

fn request(text: &str) -> ChatRequest {
    ChatRequest {
        model: "openchat".to_string(),
        messages: vec![ChatMessage::user(text)],
    }
}

async fn collect(client: &OllamaChatClient, req: ChatRequest) -> Vec<Result<ChatDelta, TransportError>> {
    client.stream_chat(req).await.unwrap().collect().await
}

#[tokio::test]
async fn streams_deltas_until_done() {
    let f1 = frame("Hello ", false);
    let f2 = frame("world. How ", false);
    let f3 = frame("are you?", false);
    let f4 = frame("", true);
    // Split a frame across two body chunks.
    let (a, b) = f2.split_at(7);
    let (url, _) = serve(StatusCode::OK, &[f1.as_str(), a, b, f3.as_str(), f4.as_str()]).await;

    let client = OllamaChatClient::new(&url).unwrap();
    let items = collect(&client, request("hi")).await;

    assert_eq!(
        items,
        vec![
            Ok(ChatDelta::content("Hello ")),
            Ok(ChatDelta::content("world. How ")),
            Ok(ChatDelta::content("are you?")),
            Ok(ChatDelta::last("")),
        ]
    );
}

#[tokio::test]
async fn posts_model_history_and_stream_flag() {
    let done = frame("", true);
    let (url, seen) = serve(StatusCode::OK, &[done.as_str()]).await;
    let client = OllamaChatClient::new(&url).unwrap();

    let req = ChatRequest {
        model: "llama3".to_string(),
        messages: vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello."),
            ChatMessage::user("Again"),
        ],
    };
    let _ = collect(&client, req).await;

    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body["model"], "llama3");
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    assert_eq!(body["messages"][1]["role"], "assistant");
    assert_eq!(body["messages"][2]["content"], "Again");
}

#[tokio::test]
async fn error_status_is_reported_with_body() {
    let (url, _) = serve(StatusCode::NOT_FOUND, &["model 'nope' not found"]).await;
    let client = OllamaChatClient::new(&url).unwrap();

    let Err(err) = client.stream_chat(request("hi")).await else {
        panic!("expected status error");
    };
    assert_eq!(
        err,
        TransportError::Status {
            status: 404,
            body: "model 'nope' not found".to_string()
        }
    );
}

#[tokio::test]
async fn long_error_body_is_cut_on_a_char_boundary() {
    let page = "é".repeat(2000);
    let (url, _) = serve(StatusCode::INTERNAL_SERVER_ERROR, &[page.as_str()]).await;
    let client = OllamaChatClient::new(&url).unwrap();

    let Err(TransportError::Status { status, body }) = client.stream_chat(request("hi")).await
    else {
        panic!("expected status error");
    };
    assert_eq!(status, 500);
    assert_eq!(body.chars().count(), 512);
    assert!(body.chars().all(|c| c == 'é'));
}

#[tokio::test]
async fn malformed_frame_fails_after_earlier_deltas() {
    let f1 = frame("Fine.", false);
    let (url, _) = serve(StatusCode::OK, &[f1.as_str(), "{broken\n"]).await;
    let client = OllamaChatClient::new(&url).unwrap();

    let items = collect(&client, request("hi")).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok(ChatDelta::content("Fine.")));
    assert!(matches!(items[1], Err(TransportError::Framing(_))));
}

#[tokio::test]
async fn in_band_error_frame_ends_the_stream() {
    let (url, _) = serve(StatusCode::OK, &["{\"error\":\"out of memory\"}\n"]).await;
    let client = OllamaChatClient::new(&url).unwrap();

    let items = collect(&client, request("hi")).await;
    assert_eq!(
        items,
        vec![Err(TransportError::Server("out of memory".to_string()))]
    );
}

#[tokio::test]
async fn missing_done_frame_is_unexpected_eof() {
    let f1 = frame("Cut", false);
    let (url, _) = serve(StatusCode::OK, &[f1.as_str()]).await;
    let client = OllamaChatClient::new(&url).unwrap();

    let items = collect(&client, request("hi")).await;
    assert_eq!(items.last(), Some(&Err(TransportError::UnexpectedEof)));
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OllamaChatClient::new(&format!("http://{addr}")).unwrap();
    let result = client.stream_chat(request("hi")).await;
    assert!(matches!(result, Err(TransportError::Request(_))));
}
