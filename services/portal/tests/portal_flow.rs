//! End-to-end HTTP flow with in-process providers

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use common::credentials::CsvCredentialStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use portal::alerts::{LocationResolver, MessageSender, OutboundMessage};
use portal::config::PortalConfig;
use portal::error::AlertError;
use portal::middleware::SESSION_COOKIE;
use portal::routes::create_router;

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<OutboundMessage>>,
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), AlertError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct FixedResolver(&'static str);

#[async_trait]
impl LocationResolver for FixedResolver {
    async fn lookup(&self) -> Result<String, AlertError> {
        Ok(self.0.to_string())
    }
}

struct Harness {
    app: Router,
    sender: Arc<RecordingSender>,
    cookie: Option<String>,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PortalConfig {
            users_file: dir.path().join("users.csv"),
            ..PortalConfig::default()
        };

        let store = CsvCredentialStore::new(&config.users_file).unwrap();
        let sender = Arc::new(RecordingSender::default());
        let state = portal::assemble_state(
            &config,
            Arc::new(store),
            sender.clone(),
            Arc::new(FixedResolver("-1.2921,36.8219\n")),
        );

        Self {
            app: create_router(state),
            sender,
            cookie: None,
            dir,
        }
    }

    async fn call(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            assert!(pair.starts_with(SESSION_COOKIE));
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(&mut self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(Method::POST, uri, body).await
    }
}

fn sign_up_body(username: &str) -> Value {
    json!({
        "username": username,
        "email": "rider@example.com",
        "password": "longenough1",
        "confirm_password": "longenough1"
    })
}

#[tokio::test]
async fn test_health_needs_no_session() {
    let mut harness = Harness::new();

    let (status, body) = harness.call(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(harness.cookie, None);
}

#[tokio::test]
async fn test_full_flow_from_home_to_sign_out() {
    let mut harness = Harness::new();

    let (status, view) = harness.call(Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["page"], "home");
    assert!(harness.cookie.is_some());

    let (_, view) = harness.post("/home/sign-up", None).await;
    assert_eq!(view["page"], "signup");

    let (status, view) = harness.post("/sign-up", Some(sign_up_body("rider"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["page"], "signin");
    assert_eq!(view["flash"]["message"], "Account created successfully!");

    let users = std::fs::read_to_string(harness.dir.path().join("users.csv")).unwrap();
    assert!(users.starts_with("username,password,email,created_at,last_login\n"));
    assert!(!users.contains("longenough1"));

    let (status, view) = harness
        .post(
            "/sign-in",
            Some(json!({"username": "rider", "password": "longenough1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["page"], "dashboard");
    assert_eq!(view["user"], "rider");
    assert_eq!(view["content"]["greeting"], "Welcome, rider!");

    let (_, view) = harness.post("/dashboard/alert-panel", None).await;
    assert_eq!(view["page"], "alert_panel");

    let (status, view) = harness.post("/alerts/location", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        view["content"]["location_link"],
        "https://maps.google.com/?q=-1.2921,36.8219"
    );

    let (status, view) = harness
        .post("/alerts/text", Some(json!({"message": "Driver took a detour"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["flash"]["message"], "Text message sent successfully!");

    let (status, _) = harness
        .post(
            "/alerts/audio",
            Some(json!({"alert": "gun_shot", "vehicle_no": "KDA 123X"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    {
        let sent = harness.sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].body, "Driver took a detour");
        assert!(sent[1].body.contains("Vehicle No: KDA 123X"));
        assert!(sent[1].media_url.is_some());
    }

    let (status, view) = harness.post("/sign-out", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["page"], "home");
    assert_eq!(view["user"], Value::Null);

    let (_, view) = harness.call(Method::GET, "/", None).await;
    assert_eq!(view["page"], "home");
}

#[tokio::test]
async fn test_errors_are_rendered_on_the_same_page() {
    let mut harness = Harness::new();

    harness.post("/home/sign-up", None).await;
    let mut weak = sign_up_body("rider");
    weak["password"] = json!("short1");
    weak["confirm_password"] = json!("short1");

    let (status, view) = harness.post("/sign-up", Some(weak)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(view["page"], "signup");
    assert_eq!(view["error"], "validation");
    assert_eq!(view["flash"]["level"], "error");

    harness.post("/sign-up", Some(sign_up_body("rider"))).await;
    let (status, view) = harness
        .post(
            "/sign-in",
            Some(json!({"username": "rider", "password": "wrongpass1"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(view["page"], "signin");
    assert_eq!(view["flash"]["message"], "Invalid username or password");

    harness.post("/home", None).await;
    harness.post("/home/sign-up", None).await;
    let (status, view) = harness.post("/sign-up", Some(sign_up_body("rider"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(view["error"], "duplicate_account");
}

#[tokio::test]
async fn test_alert_routes_require_sign_in() {
    let mut harness = Harness::new();

    let (status, view) = harness
        .post("/alerts/text", Some(json!({"message": "help"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(view["page"], "home");
    assert_eq!(view["error"], "navigation");

    let (status, _) = harness.post("/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, view) = harness.post("/sign-up", Some(sign_up_body("rider"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(view["page"], "home");

    assert!(harness.sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_text_alert_is_unprocessable() {
    let mut harness = Harness::new();

    harness.post("/home/sign-up", None).await;
    harness.post("/sign-up", Some(sign_up_body("rider"))).await;
    harness
        .post(
            "/sign-in",
            Some(json!({"username": "rider", "password": "longenough1"})),
        )
        .await;
    harness.post("/dashboard/alert-panel", None).await;

    let (status, view) = harness
        .post("/alerts/text", Some(json!({"message": "   "})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(view["error"], "empty_input");
    assert_eq!(
        view["flash"]["message"],
        "Please enter a message before sending."
    );
    assert!(harness.sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_body_renders_the_current_page() {
    let mut harness = Harness::new();

    harness.post("/home/sign-in", None).await;

    let (status, view) = harness.post("/sign-in", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(view["page"], "signin");
    assert_eq!(view["error"], "validation");
    assert_eq!(view["flash"]["level"], "error");
    assert!(
        view["flash"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request:")
    );

    // No JSON content type at all
    let (status, view) = harness.post("/alerts/text", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(view["page"], "signin");

    // The session survives and the page still works
    let (status, view) = harness.post("/home", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["page"], "home");
}
