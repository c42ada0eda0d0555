//! HTTP tests for the biometric endpoints

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bioguard_core::{
    testing::{fast_hasher, FailingMailer, ManualClock, RecordingMailer, TEST_SESSION_SECRET},
    BiometricGuard, MemoryUserStore, ResetCodeMailer,
};
use bioguard_server::{router, AccessTokenIssuer, AppState};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const ACCESS_SECRET: &[u8] = b"access-secret-for-tests-0123456789abcdef";
const EMAIL: &str = "ada@example.com";

struct TestApp {
    app: Router,
    mailer: Arc<RecordingMailer>,
    clock: Arc<ManualClock>,
    access: AccessTokenIssuer,
    access_token: String,
}

async fn test_app() -> TestApp {
    let mailer = Arc::new(RecordingMailer::new());
    build_app(mailer.clone(), mailer).await
}

async fn build_app(mailer: Arc<RecordingMailer>, transport: Arc<dyn ResetCodeMailer>) -> TestApp {
    let store = Arc::new(MemoryUserStore::new());
    let user = store.register_user(EMAIL, Utc::now()).await.unwrap();
    let clock = Arc::new(ManualClock::default());

    let guard = BiometricGuard::builder(store, TEST_SESSION_SECRET.to_vec())
        .hasher(Arc::new(fast_hasher()))
        .mailer(transport)
        .clock(clock.clone())
        .build()
        .unwrap();
    let access = AccessTokenIssuer::new(ACCESS_SECRET, 3600).unwrap();
    let access_token = access.issue(user.user_id, Utc::now()).unwrap();

    TestApp {
        app: router(AppState::new(
            guard,
            AccessTokenIssuer::new(ACCESS_SECRET, 3600).unwrap(),
        )),
        mailer,
        clock,
        access,
        access_token,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(self.access_token.as_str()), Some(body))
            .await
    }

    async fn post_public(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, None, Some(body)).await
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    async fn setup(&self, pin: &str) {
        let (status, _) = self.post("/biometric/setup-pin", json!({ "pin": pin })).await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn biometric_token(&self, pin: &str) -> String {
        let (status, body) = self.post("/biometric/verify-pin", json!({ "pin": pin })).await;
        assert_eq!(status, StatusCode::OK);
        body["biometricToken"].as_str().unwrap().to_string()
    }

    async fn lock_out(&self) {
        for _ in 0..5 {
            self.post("/biometric/verify-pin", json!({ "pin": "0000" }))
                .await;
        }
    }
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_primary_session_required() {
    let app = test_app().await;

    let (status, body) = app
        .call(Method::POST, "/biometric/setup-pin", None, Some(json!({ "pin": "5678" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_AUTHENTICATED");

    let (status, _) = app.get("/biometric/status", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_setup_verify_and_session() {
    let app = test_app().await;

    let (status, body) = app.post("/biometric/setup-pin", json!({ "pin": "5678" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["pinCreatedAt"].is_string());

    let (status, body) = app.post("/biometric/verify-pin", json!({ "pin": "5678" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["expiresAt"].is_string());
    let token = body["biometricToken"].as_str().unwrap().to_string();

    let (status, body) = app.get("/biometric/session", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["biometricVerified"], true);
    assert!(body["userId"].is_string());

    // Alternative header
    let request = Request::builder()
        .uri("/biometric/session")
        .header("x-biometric-token", token.as_str())
        .body(Body::empty())
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tokens_are_not_interchangeable() {
    let app = test_app().await;
    app.setup("5678").await;
    let biometric = app.biometric_token("5678").await;

    let (status, body) = app.get("/biometric/status", &biometric).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "NOT_AUTHENTICATED");

    let (status, body) = app.get("/biometric/session", &app.access_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "BIOMETRIC_TOKEN_INVALID");
}

#[tokio::test]
async fn test_missing_biometric_token() {
    let app = test_app().await;
    let (status, body) = app.call(Method::GET, "/biometric/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "BIOMETRIC_TOKEN_INVALID");
}

#[tokio::test]
async fn test_expired_biometric_token() {
    let app = test_app().await;
    app.setup("5678").await;
    let token = app.biometric_token("5678").await;

    app.clock.advance(Duration::hours(8) + Duration::seconds(1));

    let (status, body) = app.get("/biometric/session", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BIOMETRIC_TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_biometric_token_after_disable() {
    let app = test_app().await;
    app.setup("5678").await;
    let token = app.biometric_token("5678").await;

    let (status, _) = app.post("/biometric/disable", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/biometric/session", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BIOMETRIC_NOT_CONFIGURED");
}

#[tokio::test]
async fn test_validation_errors() {
    let app = test_app().await;

    let (status, body) = app.post("/biometric/setup-pin", json!({ "pin": "12a4" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "PIN must contain only digits");

    let (status, body) = app.post("/biometric/setup-pin", json!({ "code": "5678" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/biometric/request-pin-reset")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lockout_responses() {
    let app = test_app().await;
    app.setup("5678").await;

    let (status, body) = app.post("/biometric/verify-pin", json!({ "pin": "0000" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INCORRECT_PIN");
    assert_eq!(body["attemptsRemaining"], 4);

    for _ in 0..3 {
        app.post("/biometric/verify-pin", json!({ "pin": "0000" }))
            .await;
    }

    let (status, body) = app.post("/biometric/verify-pin", json!({ "pin": "0000" })).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["code"], "PIN_LOCKED");
    assert_eq!(body["attemptsRemaining"], 0);
    assert!(body["lockedUntil"].is_string());

    let (status, _) = app.post("/biometric/verify-pin", json!({ "pin": "5678" })).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, body) = app.get("/biometric/status", &app.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isLocked"], true);
    assert_eq!(body["failedPinAttempts"], 5);
}

#[tokio::test]
async fn test_change_and_disable() {
    let app = test_app().await;
    app.setup("5678").await;

    let (status, body) = app
        .post(
            "/biometric/change-pin",
            json!({ "currentPin": "5678", "newPin": "5678" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post(
            "/biometric/change-pin",
            json!({ "currentPin": "5678", "newPin": "2468" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = app.biometric_token("2468").await;

    let (status, body) = app.post("/biometric/disable", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.get("/biometric/session", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "BIOMETRIC_NOT_CONFIGURED");

    let (_, body) = app.get("/biometric/status", &app.access_token).await;
    assert_eq!(body["biometricEnabled"], false);
    assert_eq!(body["pinCreatedAt"], Value::Null);
}

#[tokio::test]
async fn test_unknown_user() {
    let app = test_app().await;
    let stranger = app.access.issue(Uuid::new_v4(), Utc::now()).unwrap();

    let (status, body) = app.get("/biometric/status", &stranger).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_reset_flow() {
    let app = test_app().await;
    app.setup("5678").await;

    let (status, body) = app
        .post_public("/biometric/request-pin-reset", json!({ "email": EMAIL }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_LOCKED");

    app.lock_out().await;

    let (status, body) = app
        .post_public("/biometric/request-pin-reset", json!({ "email": EMAIL }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["codeExpiresInSecs"], 600);
    let code = app.mailer.last_code_for(EMAIL).unwrap();
    let wrong: String = code.chars().map(|c| if c == '1' { '2' } else { '1' }).collect();

    let (status, body) = app
        .post_public("/biometric/verify-code", json!({ "email": EMAIL, "code": wrong }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OR_EXPIRED_CODE");

    let (status, body) = app
        .post_public("/biometric/verify-code", json!({ "email": EMAIL, "code": code }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, body) = app
        .post_public(
            "/biometric/reset-pin",
            json!({ "email": EMAIL, "code": code, "newPin": "1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post_public(
            "/biometric/reset-pin",
            json!({ "email": EMAIL, "code": code, "newPin": "5791" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_public(
            "/biometric/reset-pin",
            json!({ "email": EMAIL, "code": code, "newPin": "8642" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OR_EXPIRED_CODE");

    app.biometric_token("5791").await;
}

#[tokio::test]
async fn test_delivery_failure() {
    let app = build_app(Arc::new(RecordingMailer::new()), Arc::new(FailingMailer)).await;
    app.setup("5678").await;
    app.lock_out().await;

    let (status, body) = app
        .post_public("/biometric/request-pin-reset", json!({ "email": EMAIL }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DELIVERY_FAILED");
}
