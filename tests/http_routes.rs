use artifact_lens_lib::config::Config;
use artifact_lens_lib::{build_router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use clap::Parser;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

mod common;

const BOUNDARY: &str = "----artifact-lens-boundary";

fn router(upload_dir: &Path, audio_dir: &Path) -> Router {
    let (predictor, _) = common::predictor(upload_dir);
    let config = Config::try_parse_from([
        "artifact-lens".to_string(),
        "--audio-dir".to_string(),
        audio_dir.display().to_string(),
        "--allowed-origins".to_string(),
        "http://localhost:3000".to_string(),
    ])
    .unwrap();
    let state = AppState {
        predictor,
        predict_timeout: None,
    };
    build_router(state, &config).unwrap()
}

fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/uploadfile")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_acknowledges() {
    let uploads = tempdir().unwrap();
    let audios = tempdir().unwrap();

    let response = router(uploads.path(), audios.path())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "Hello": "World" }));
}

#[tokio::test]
async fn upload_returns_category_and_audio() {
    let uploads = tempdir().unwrap();
    let audios = tempdir().unwrap();

    let body = multipart_body("file", "metate.png", "image/png", &common::png_for_index(1));
    let response = router(uploads.path(), audios.path())
        .oneshot(upload_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "data": { "nombre": "Metate", "audio": "/audios/metate.mp3" } })
    );

    let stored: Vec<_> = std::fs::read_dir(uploads.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ends_with(".png"));
}

#[tokio::test]
async fn handled_failures_keep_status_ok() {
    let uploads = tempdir().unwrap();
    let audios = tempdir().unwrap();

    let body = multipart_body("file", "notes.txt", "text/plain", b"hello kiosk");
    let response = router(uploads.path(), audios.path())
        .oneshot(upload_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["error"], "DecodeError");
    let message = body["message"].as_str().unwrap();
    assert!(!message.contains(&uploads.path().display().to_string()));
}

#[tokio::test]
async fn missing_file_field_is_reported() {
    let uploads = tempdir().unwrap();
    let audios = tempdir().unwrap();

    let body = multipart_body("photo", "cacao.png", "image/png", &common::png_for_index(0));
    let response = router(uploads.path(), audios.path())
        .oneshot(upload_request(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["error"], "BadRequestError");
    assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn audio_clips_are_served() {
    let uploads = tempdir().unwrap();
    let audios = tempdir().unwrap();
    std::fs::write(audios.path().join("cacao.mp3"), b"ID3 fake narration").unwrap();

    let response = router(uploads.path(), audios.path())
        .oneshot(Request::get("/audios/cacao.mp3").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ID3 fake narration");
}

#[tokio::test]
async fn cors_allows_configured_origin_only() {
    let uploads = tempdir().unwrap();
    let audios = tempdir().unwrap();
    let app = router(uploads.path(), audios.path());

    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/uploadfile")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app
        .clone()
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );

    let denied = app.oneshot(preflight("http://evil.example")).await.unwrap();
    assert!(denied
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
