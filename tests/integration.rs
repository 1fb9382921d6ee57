use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use understanding_relay::{
    ai::{MockContentClient, MockFileClient},
    auth::{MockTokenProvider, TokenProvider},
    models::FileState,
    poll::PollPolicy,
    relay::{Relay, RelayServices, RelaySettings},
    server::{build_router, AppState},
};

const BOUNDARY: &str = "relay-test-boundary";
const PNG_URL: &str = "data:image/png;base64,iVBORw0KGgo=";
const MP4_BYTES: &[u8] = &[0, 0, 0, 24, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm'];

struct TestApp {
    router: Router,
    files: MockFileClient,
    content: MockContentClient,
}

fn test_app_with(
    files: MockFileClient,
    content: MockContentClient,
    tokens: Option<Arc<dyn TokenProvider>>,
    api_key_configured: bool,
) -> TestApp {
    let relay = Relay::with_services(
        RelayServices {
            files: Box::new(files.clone()),
            content: Box::new(content.clone()),
        },
        RelaySettings {
            poll: PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 24,
                ..PollPolicy::default()
            },
            ..Default::default()
        },
    );
    let state = AppState::new(relay, tokens, api_key_configured, 1024 * 1024);

    TestApp {
        router: build_router(Arc::new(state)),
        files,
        content,
    }
}

fn test_app(files: MockFileClient, content: MockContentClient) -> TestApp {
    test_app_with(files, content, None, true)
}

enum FormPart<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[FormPart]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
            }
            FormPart::File(name, filename, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[FormPart]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn video_form<'a>(declarations: &'a str) -> Vec<FormPart<'a>> {
    vec![
        FormPart::File("video", "clip.mp4", "video/mp4", MP4_BYTES),
        FormPart::Text("text", "Describe each scene"),
        FormPart::Text("functionDeclarations", declarations),
    ]
}

#[tokio::test]
async fn test_healthz_sets_security_headers() {
    let app = test_app(MockFileClient::new(), MockContentClient::new());

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_readyz_reflects_credentials() {
    let ready = test_app(MockFileClient::new(), MockContentClient::new());
    let (status, _) = send(&ready.router, Request::get("/readyz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let no_key = test_app_with(MockFileClient::new(), MockContentClient::new(), None, false);
    let (status, body) =
        send(&no_key.router, Request::get("/readyz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "missing API key");

    let broken_auth = test_app_with(
        MockFileClient::new(),
        MockContentClient::new(),
        Some(Arc::new(MockTokenProvider::new())),
        true,
    );
    let (status, body) =
        send(&broken_auth.router, Request::get("/readyz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "authentication check failed");
}

#[tokio::test]
async fn test_auth_token_endpoint() {
    let tokens = MockTokenProvider::new().with_token("ya29.test".to_string());
    let tracker = tokens.clone();
    let app = test_app_with(
        MockFileClient::new(),
        MockContentClient::new(),
        Some(Arc::new(tokens)),
        false,
    );

    let (status, body) = send(
        &app.router,
        Request::post("/api/auth/token").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "accessToken": "ya29.test" }));
    assert_eq!(tracker.get_call_count(), 1);

    let failing = test_app_with(
        MockFileClient::new(),
        MockContentClient::new(),
        Some(Arc::new(MockTokenProvider::new())),
        false,
    );
    let (status, body) = send(
        &failing.router,
        Request::post("/api/auth/token").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to get access token" }));
}

#[tokio::test]
async fn test_image_generate_returns_parsed_json() {
    let content = MockContentClient::new()
        .with_text_response("```json\n[{\"point\":[500,250],\"label\":\"cup\"}]\n```");
    let app = test_app(MockFileClient::new(), content);

    let (status, body) = send(
        &app.router,
        json_request(
            "/api/image/generate",
            json!({ "imageDataUrl": PNG_URL, "prompt": "Point to the cup", "temperature": 0.2 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "point": [500, 250], "label": "cup" }]));
    assert_eq!(app.content.get_call_count(), 1);
}

#[tokio::test]
async fn test_image_generate_reshapes_detections() {
    let content = MockContentClient::new()
        .with_text_response("[{\"box_2d\":[100,200,300,600],\"label\":\"mug\"}]");
    let app = test_app(MockFileClient::new(), content);

    let (status, body) = send(
        &app.router,
        json_request(
            "/api/image/generate",
            json!({
                "imageDataUrl": PNG_URL,
                "target": "mugs",
                "detectType": "2D bounding boxes"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["label"], "mug");
    assert_eq!(body[0]["x"], 0.2);
    assert_eq!(body[0]["y"], 0.1);
}

#[tokio::test]
async fn test_image_generate_validation_errors() {
    let app = test_app(MockFileClient::new(), MockContentClient::new());

    let (status, body) = send(
        &app.router,
        json_request("/api/image/generate", json!({ "imageDataUrl": PNG_URL })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("prompt"));

    let (status, _) = send(
        &app.router,
        json_request("/api/image/generate", json!({ "prompt": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        Request::post("/api/image/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.content.get_call_count(), 0);
}

#[tokio::test]
async fn test_image_generate_malformed_output_is_server_error() {
    let content = MockContentClient::new().with_text_response("Sorry, I can't see that.");
    let app = test_app(MockFileClient::new(), content);

    let (status, body) = send(
        &app.router,
        json_request(
            "/api/image/generate",
            json!({ "imageDataUrl": PNG_URL, "prompt": "x" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_video_upload_returns_active_handle() {
    let files = MockFileClient::new()
        .with_state(FileState::Processing)
        .with_state(FileState::Active);
    let app = test_app(files, MockContentClient::new());

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/video/upload",
            &[FormPart::File("video", "clip.mp4", "video/mp4", MP4_BYTES)],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "files/mock-1");
    assert_eq!(body["state"], "ACTIVE");
    assert_eq!(app.files.get_upload_count(), 1);
    assert_eq!(app.files.get_status_count(), 2);
}

#[tokio::test]
async fn test_video_upload_requires_video_part() {
    let app = test_app(MockFileClient::new(), MockContentClient::new());

    let (status, body) = send(
        &app.router,
        multipart_request("/api/video/upload", &[FormPart::Text("text", "hello")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("video"));
    assert_eq!(app.files.get_upload_count(), 0);
}

#[tokio::test]
async fn test_video_generate_relays_function_call() {
    let provider: Value = json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{
                    "functionCall": {
                        "id": "call-1",
                        "name": "set_timecodes",
                        "args": { "timecodes": [{ "time": "0:01", "text": "It\\'s a dog" }] }
                    },
                    "thoughtSignature": "c2ln"
                }]
            },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "totalTokenCount": 42 }
    });
    let content =
        MockContentClient::new().with_response(serde_json::from_value(provider.clone()).unwrap());
    let app = test_app(MockFileClient::new().with_state(FileState::Active), content);

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/video/generate",
            &video_form("[{\"name\":\"set_timecodes\"}]"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    // Provider body comes back untouched, with the cleaned-up timecodes added.
    let mut expected = provider;
    expected["timecodes"] = json!([{ "time": "0:01", "text": "It's a dog" }]);
    assert_eq!(body, expected);

    let (model, sent) = app.content.get_requests().remove(0);
    assert_eq!(model, "gemini-2.0-flash-exp");
    assert_eq!(
        sent.tools.unwrap()[0].function_declarations,
        json!([{ "name": "set_timecodes" }])
    );
}

#[tokio::test]
async fn test_video_generate_rejects_invalid_declarations_before_upload() {
    let app = test_app(MockFileClient::new(), MockContentClient::new());

    let (status, body) = send(
        &app.router,
        multipart_request("/api/video/generate", &video_form("not json")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Invalid functionDeclarations format"));
    assert_eq!(app.files.get_upload_count(), 0);
}

#[tokio::test]
async fn test_video_generate_timeout_deletes_once() {
    let files = MockFileClient::new().with_state(FileState::Processing);
    let app = test_app(files, MockContentClient::new());

    let (status, body) = send(
        &app.router,
        multipart_request("/api/video/generate", &video_form("[]")),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
    assert_eq!(app.files.get_status_count(), 25);
    assert_eq!(app.files.get_deleted(), vec!["files/mock-1".to_string()]);
    assert_eq!(app.content.get_call_count(), 0);
}

#[tokio::test]
async fn test_video_generate_failed_processing_keeps_file() {
    let files = MockFileClient::new()
        .with_state(FileState::Processing)
        .with_state(FileState::Failed);
    let app = test_app(files, MockContentClient::new());

    let (status, body) = send(
        &app.router,
        multipart_request("/api/video/generate", &video_form("[]")),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("processing failed"));
    assert_eq!(app.files.get_delete_count(), 0);
    assert_eq!(app.content.get_call_count(), 0);
}

#[tokio::test]
async fn test_generate_from_uploaded_skips_upload() {
    let app = test_app(MockFileClient::new(), MockContentClient::new());

    let (status, _) = send(
        &app.router,
        multipart_request(
            "/api/video/generate-from-uploaded",
            &[
                FormPart::Text("fileUri", "https://files.example.com/v1beta/files/abc"),
                FormPart::Text("mimeType", "video/mp4"),
                FormPart::Text("text", "Summarize"),
                FormPart::Text("functionDeclarations", "[]"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.files.get_upload_count(), 0);
    assert_eq!(app.content.get_call_count(), 1);

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/video/generate-from-uploaded",
            &[
                FormPart::Text("text", "Summarize"),
                FormPart::Text("functionDeclarations", "[]"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fileUri"));
}
