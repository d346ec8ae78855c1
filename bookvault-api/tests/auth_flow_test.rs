/// Integration tests for registration, login and the request gates
///
/// These drive the full router in-process:
/// - register / login / get-token
/// - bearer gate rejections (missing, malformed, garbage, expired, foreign)
/// - basic gate challenges
/// - authentication switched off

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bookvault_shared::auth::jwt::Claims;
use common::{TestContext, JWT_SECRET};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

fn basic(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", email, password)))
}

#[tokio::test]
async fn test_register_login_and_me() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Method::POST,
            "/api/v1/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "password123" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["email"], "a@x.com");
    assert!(response.body["id"].as_i64().unwrap() > 0);
    assert!(response.body.get("secret_digest").is_none());
    assert!(response.body.get("password").is_none());
    let id = response.body["id"].as_i64().unwrap();

    let token = ctx.login("a@x.com", "password123").await;
    let claims = ctx.state.codec.verify(&token).unwrap();
    assert_eq!(claims.user_id, id);
    assert_eq!(claims.email.as_deref(), Some("a@x.com"));

    let me = ctx
        .send(Method::GET, "/api/v1/users/me", Some(&format!("Bearer {}", token)), None)
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["id"], id);
    assert_eq!(me.body["email"], "a@x.com");
    assert!(!me.body.to_string().contains("argon2"));
}

#[tokio::test]
async fn test_bearer_gate_rejections() {
    let ctx = TestContext::new();
    let (id, _) = ctx.signed_in("a@x.com", "password123").await;

    let missing = ctx.send(Method::GET, "/api/v1/users/me", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong_scheme = ctx
        .send(Method::GET, "/api/v1/users/me", Some("Token abc"), None)
        .await;
    assert_eq!(wrong_scheme.status, StatusCode::UNAUTHORIZED);
    assert_ne!(missing.body["message"], wrong_scheme.body["message"]);

    let lowercase = ctx
        .send(Method::GET, "/api/v1/users/me", Some("bearer abc"), None)
        .await;
    assert_eq!(lowercase.status, StatusCode::UNAUTHORIZED);

    let garbage = ctx
        .send(Method::GET, "/api/v1/users/me", Some("Bearer garbage"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let expired = ctx
        .state
        .codec
        .issue(&Claims::new(id, None), chrono::Duration::seconds(-5))
        .unwrap();
    let expired = ctx
        .send(Method::GET, "/api/v1/users/me", Some(&format!("Bearer {}", expired)), None)
        .await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);

    // Every verification failure looks the same from outside
    assert_eq!(garbage.body, expired.body);
}

#[tokio::test]
async fn test_foreign_key_and_algorithm_rejected() {
    let ctx = TestContext::new();
    let (id, _) = ctx.signed_in("a@x.com", "password123").await;
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
    let claims = json!({ "user_id": id, "email": "a@x.com", "exp": exp });

    let foreign = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-that-is-32-bytes-long"),
    )
    .unwrap();
    let hs512 = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    for token in [foreign, hs512] {
        let response = ctx
            .send(Method::GET, "/api/v1/users/me", Some(&format!("Bearer {}", token)), None)
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    // Same claims, right key and algorithm: admitted
    let good = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    let response = ctx
        .send(Method::GET, "/api/v1/users/me", Some(&format!("Bearer {}", good)), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();

    let bad_email = ctx
        .send(
            Method::POST,
            "/api/v1/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "password123" })),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.body["error"], "validation_error");
    assert_eq!(bad_email.body["details"][0]["field"], "email");

    let short = ctx
        .send(
            Method::POST,
            "/api/v1/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "short" })),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["details"][0]["field"], "password");

    let missing_field = ctx
        .send(Method::POST, "/api/v1/register", None, Some(json!({ "email": "a@x.com" })))
        .await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);

    let malformed = ctx
        .send_raw(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.body["error"], "bad_request");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let ctx = TestContext::new();
    ctx.register("a@x.com", "password123").await;

    let again = ctx
        .send(
            Method::POST,
            "/api/v1/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "another123" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["error"], "conflict");
}

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    let ctx = TestContext::new();

    let attempts = (0..5).map(|_| {
        ctx.send(
            Method::POST,
            "/api/v1/register",
            None,
            Some(json!({ "email": "race@x.com", "password": "password123" })),
        )
    });
    let responses = futures::future::join_all(attempts).await;

    let created = responses
        .iter()
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    let conflicts = responses
        .iter()
        .filter(|r| r.status == StatusCode::CONFLICT)
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 4);
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let ctx = TestContext::new();
    ctx.register("a@x.com", "password123").await;

    let wrong_password = ctx
        .send(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrongpassword" })),
        )
        .await;
    let unknown_email = ctx
        .send(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({ "email": "nobody@x.com", "password": "password123" })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status, unknown_email.status);
    assert_eq!(wrong_password.body, unknown_email.body);
}

#[tokio::test]
async fn test_get_token_with_basic_credentials() {
    let ctx = TestContext::new();
    let id = ctx.register("a@x.com", "password123").await;

    let missing = ctx.send(Method::GET, "/api/v1/get-token", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.headers[header::WWW_AUTHENTICATE], "Basic realm=\"Restricted\"");

    let wrong = ctx
        .send(Method::GET, "/api/v1/get-token", Some(&basic("a@x.com", "nope12345")), None)
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.headers[header::WWW_AUTHENTICATE], "Basic realm=\"Restricted\"");

    // A bearer token is not a basic credential
    let bearer = ctx
        .send(Method::GET, "/api/v1/get-token", Some("Bearer abc"), None)
        .await;
    assert_eq!(bearer.status, StatusCode::UNAUTHORIZED);

    let ok = ctx
        .send(Method::GET, "/api/v1/get-token", Some(&basic("a@x.com", "password123")), None)
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    let token = ok.body["token"].as_str().unwrap();
    assert_eq!(ctx.state.codec.verify(token).unwrap().user_id, id);

    let me = ctx
        .send(Method::GET, "/api/v1/users/me", Some(&format!("Bearer {}", token)), None)
        .await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_disabled() {
    let ctx = TestContext::without_auth();

    let token = ctx.send(Method::GET, "/api/v1/get-token", None, None).await;
    assert_eq!(token.status, StatusCode::OK);
    let claims = ctx
        .state
        .codec
        .verify(token.body["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.user_id, 0);
    assert_eq!(claims.email.as_deref(), Some("test@example.com"));

    let books = ctx.send(Method::GET, "/api/v1/books", None, None).await;
    assert_eq!(books.status, StatusCode::OK);
    assert_eq!(books.body, json!([]));

    // The anonymous principal has no record
    let me = ctx.send(Method::GET, "/api/v1/users/me", None, None).await;
    assert_eq!(me.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let response = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["store"]["backend"], "memory");
    assert_eq!(response.body["store"]["connected"], true);
    assert!(response.body["version"].is_string());
}
