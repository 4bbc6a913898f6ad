mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::test_state;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "parlor-test-boundary";

/// Builds a multipart/form-data body with a single `file` field.
fn multipart_file(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(session_id: &str, filename: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(format!("/api/upload?sessionId={session_id}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_file(filename, content)))
        .expect("valid request")
}

/// A real 1x1 PNG produced by the image crate.
fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        1,
        1,
        image::Rgb([10, 20, 30]),
    ));
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .expect("png encoding");
    buffer.into_inner()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn image_upload_round_trips_through_the_store() {
    let (state, _db) = test_state();

    // Uploads are scoped to a live session.
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    let session_id = state.sessions.register(tx).await;

    let attachments = state.attachments.clone();
    let app = parlor_server::app(state);

    let response = app
        .oneshot(upload_request(&session_id.to_string(), "dot.png", &tiny_png()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["pages"], 1);
    let file_id = json["fileId"].as_str().expect("fileId present");

    let pages = attachments
        .resolve(file_id, session_id)
        .expect("owner can resolve the stored attachment");
    assert_eq!(pages.len(), 1);
    assert!(!pages[0].is_empty(), "page is base64 content");
}

#[tokio::test]
async fn upload_requires_known_session() {
    let (state, _db) = test_state();
    let app = parlor_server::app(state);

    let response = app
        .oneshot(upload_request(
            &Uuid::new_v4().to_string(),
            "dot.png",
            &tiny_png(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("unknown session"));
}

#[tokio::test]
async fn disallowed_extension_is_rejected_with_reason() {
    let (state, _db) = test_state();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    let session_id = state.sessions.register(tx).await;
    let attachments = state.attachments.clone();
    let app = parlor_server::app(state);

    let response = app
        .oneshot(upload_request(&session_id.to_string(), "notes.txt", b"hello"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "File type 'txt' not allowed.");
    assert!(attachments.is_empty(), "nothing partial is stored");
}

#[tokio::test]
async fn corrupt_image_is_rejected() {
    let (state, _db) = test_state();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    let session_id = state.sessions.register(tx).await;
    let attachments = state.attachments.clone();
    let app = parlor_server::app(state);

    // Valid extension, but the content is not an image at all.
    let response = app
        .oneshot(upload_request(&session_id.to_string(), "fake.png", b"not an image"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(attachments.is_empty());
}
