//! `HttpSpeechSynthesizer` against an in-process fake synthesis service.

use std::sync::{Arc, Mutex};

use axum::{Json, Router, body::Body, extract::State, http::StatusCode, response::Response, routing::post};
use futures_util::StreamExt;
use parley_core::VoiceSettings;
use parley_voice::{HttpSpeechSynthesizer, SpeechSynthesizer, SynthesisError};
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Clone)]
struct Service {
    status: StatusCode,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn stream(State(service): State<Service>, Json(body): Json<Value>) -> Response {
    service.seen.lock().unwrap().push(body);

    if !service.status.is_success() {
        return Response::builder()
            .status(service.status)
            .body(Body::from("speaker not found"))
            .unwrap();
    }

    let chunks = futures_util::stream::iter(
        [&b"RIFF"[..], &b"----"[..], &b"data"[..]]
            .into_iter()
            .map(|c| Ok::<_, std::io::Error>(c.to_vec())),
    );
    Response::builder()
        .header("content-type", "audio/wav")
        .body(Body::from_stream(chunks))
        .unwrap()
}

async fn serve(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route("/stream", post(stream)).with_state(Service {
        status,
        seen: Arc::clone(&seen),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/stream"), seen)
}

#[tokio::test]
async fn streams_audio_and_sends_voice_parameters() {
    let (url, seen) = serve(StatusCode::OK).await;
    let voice = VoiceSettings {
        speed: 1.25,
        ..VoiceSettings::default()
    };
    let synth = HttpSpeechSynthesizer::new(url, voice).unwrap();

    let mut payload = synth.synthesize("Hello world.").await.unwrap();
    let mut audio = Vec::new();
    while let Some(chunk) = payload.next().await {
        audio.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(audio, b"RIFF----data");

    let body = seen.lock().unwrap()[0].clone();
    assert_eq!(body["text"], "Hello world.");
    assert_eq!(body["language"], "EN");
    assert_eq!(body["speaker"], "EN-BR");
    assert_eq!(body["speed"], 1.25);
}

#[tokio::test]
async fn error_status_is_a_synthesis_error() {
    let (url, _) = serve(StatusCode::INTERNAL_SERVER_ERROR).await;
    let synth = HttpSpeechSynthesizer::new(url, VoiceSettings::default()).unwrap();

    let Err(err) = synth.synthesize("Hi.").await else {
        panic!("expected an error");
    };
    assert_eq!(
        err,
        SynthesisError::Status {
            status: 500,
            body: "speaker not found".to_string()
        }
    );
}

#[tokio::test]
async fn unreachable_service_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let synth =
        HttpSpeechSynthesizer::new(format!("http://{addr}/stream"), VoiceSettings::default())
            .unwrap();
    assert!(matches!(
        synth.synthesize("Hi.").await,
        Err(SynthesisError::Request(_))
    ));
}
