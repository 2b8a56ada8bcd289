mod common;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use resource_api::AppError;
use resource_api::api::dispatch::{Context, PathParams, Reply, Resource, Verb, dispatch};
use resource_api::domain::entities::User;
use resource_api::domain::entity::Fields;
use resource_api::state::AppState;

const HOST: &str = "api.example.com";

#[tokio::test]
async fn test_unsupported_verb_is_405_envelope() {
    let (server, _pool) = common::setup().await;

    let response = server.delete("/users").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.json::<Value>(), json!({ "error": "method not allowed" }));

    server
        .get("/sessions")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);

    server
        .method(Method::PATCH, "/users/me")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_405_comes_before_authentication() {
    let (server, _pool) = common::setup().await;

    server
        .post("/users/me")
        .add_header("Authorization", "garbage")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_head_runs_get_without_body() {
    let (server, pool) = common::setup().await;
    let user = common::seed_user(&pool, "ada@example.com", false).await;

    let response = server
        .method(Method::HEAD, "/users/me")
        .add_header("Authorization", common::bearer(&user))
        .await;

    response.assert_status_ok();
    assert!(response.as_bytes().is_empty());
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let (server, _pool) = common::setup().await;

    let response = server.get("/").add_header("Authorization", "Bearer").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Wrong authorization header");

    let response = server
        .get("/")
        .add_header("Authorization", "Basic dXNlcjpwYXNz")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Wrong authorization token type"
    );

    server
        .get("/")
        .add_header("Authorization", "bEaReR abc")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_rejected_token_means_anonymous() {
    let (server, pool) = common::setup().await;
    let user = common::seed_user(&pool, "ada@example.com", false).await;

    let expired = common::test_tokens()
        .issue_at(user.id, Utc::now() - Duration::days(15))
        .token;
    let expired = format!("Bearer {expired}");

    // Anonymous is acceptable at the index.
    server
        .get("/")
        .add_header("Authorization", expired.clone())
        .await
        .assert_status_ok();

    // But not where an identity is required.
    server
        .get("/users/me")
        .add_header("Authorization", expired)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/users/me")
        .add_header("Authorization", "Bearer forged.token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_page_links() {
    let (server, pool) = common::setup().await;
    let admin = common::seed_user(&pool, "admin@example.com", true).await;
    let mut users = Vec::new();
    for i in 0..9 {
        users.push(common::seed_user(&pool, &format!("user{i}@example.com"), false).await);
    }

    let response = server
        .get("/users")
        .add_query_param("limit", "10")
        .add_header("Host", HOST)
        .add_header("Authorization", common::bearer(&admin))
        .await;
    response.assert_status_ok();

    let json = response.json::<Value>();
    assert_eq!(json["items"].as_array().unwrap().len(), 10);
    assert_eq!(json["links"]["self"], format!("http://{HOST}/users?limit=10").as_str());
    assert_eq!(
        json["links"]["next"],
        format!("http://{HOST}/users?limit=10&page=2").as_str()
    );
    assert!(json["links"].get("prev").is_none());

    let response = server
        .get("/users")
        .add_query_param("limit", "10")
        .add_query_param("page", "2")
        .add_header("Host", HOST)
        .add_header("Authorization", common::bearer(&admin))
        .await;
    let json = response.json::<Value>();
    assert_eq!(json["items"].as_array().unwrap().len(), 0);
    assert!(json["links"].get("next").is_none());
    assert_eq!(
        json["links"]["prev"],
        format!("http://{HOST}/users?limit=10&page=1").as_str()
    );

    common::soft_delete(&pool, &users[0]).await;

    let response = server
        .get("/users")
        .add_query_param("limit", "10")
        .add_header("Host", HOST)
        .add_header("Authorization", common::bearer(&admin))
        .await;
    let json = response.json::<Value>();
    assert_eq!(json["items"].as_array().unwrap().len(), 9);
    assert!(json["links"].get("next").is_none());
}

#[tokio::test]
async fn test_limit_zero_disables_pagination() {
    let (server, pool) = common::setup().await;
    let admin = common::seed_user(&pool, "admin@example.com", true).await;
    for i in 0..3 {
        common::seed_user(&pool, &format!("user{i}@example.com"), false).await;
    }

    let response = server
        .get("/users")
        .add_query_param("limit", "0")
        .add_header("Authorization", common::bearer(&admin))
        .await;

    let json = response.json::<Value>();
    assert_eq!(json["items"].as_array().unwrap().len(), 4);
    assert!(json["links"].get("next").is_none());
}

#[tokio::test]
async fn test_invalid_pagination() {
    let (server, _pool) = common::setup().await;

    server
        .get("/")
        .add_query_param("page", "0")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/")
        .add_query_param("limit", "-1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forwarded_proto_in_links() {
    let (server, _pool) = common::setup().await;

    let response = server
        .get("/")
        .add_header("Host", HOST)
        .add_header("X-Forwarded-Proto", "https")
        .await;

    let json = response.json::<Value>();
    assert_eq!(json["links"]["self"], format!("https://{HOST}/").as_str());
    assert_eq!(json["items"][0]["users"], format!("https://{HOST}/users").as_str());
}

#[tokio::test]
async fn test_malformed_json_body() {
    let (server, _pool) = common::setup().await;

    let response = server.post("/users").text("{not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Malformed JSON body"));

    server
        .post("/users")
        .json(&json!(["a", "list"]))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rejected_write_stores_nothing() {
    let (server, pool) = common::setup().await;
    common::seed_user(&pool, "ada@example.com", false).await;

    let response = server
        .post("/users")
        .json(&json!({ "email": "bob@example.com", "password": "p", "first_name": 42 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_undecodable_id_is_404_envelope() {
    let (server, pool) = common::setup().await;
    let user = common::seed_user(&pool, "ada@example.com", false).await;

    let response = server
        .get("/users/%FF")
        .add_header("Authorization", common::bearer(&user))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({ "error": "not found" }));
}

/// Writes a user, then fails.
struct WriteThenFail;

/// Writes a user, then answers outside the envelope.
struct WriteThenRaw;

fn user_fields(email: &str) -> Fields {
    json!({ "email": email, "password": "p" })
        .as_object()
        .cloned()
        .unwrap()
}

#[async_trait]
impl Resource for WriteThenFail {
    fn name(&self) -> &'static str {
        "write-then-fail"
    }

    fn allows(&self, verb: Verb, _params: &PathParams) -> bool {
        verb == Verb::Post
    }

    async fn post(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        ctx.store::<User>()
            .create(&user_fields("rolled-back@example.com"))
            .await?;
        Err(AppError::bad_request("failed after writing"))
    }
}

#[async_trait]
impl Resource for WriteThenRaw {
    fn name(&self) -> &'static str {
        "write-then-raw"
    }

    fn allows(&self, verb: Verb, _params: &PathParams) -> bool {
        verb == Verb::Post
    }

    async fn post(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        ctx.store::<User>()
            .create(&user_fields("kept@example.com"))
            .await?;
        Ok(Reply::raw(
            (StatusCode::ACCEPTED, "exported as plain text").into_response(),
        ))
    }
}

async fn write_then_fail(State(state): State<AppState>, request: Request) -> Response {
    dispatch(&WriteThenFail, &state, PathParams::new(), request).await
}

async fn write_then_raw(State(state): State<AppState>, request: Request) -> Response {
    dispatch(&WriteThenRaw, &state, PathParams::new(), request).await
}

async fn custom_server() -> (TestServer, SqlitePool) {
    let pool = common::create_test_pool().await;
    let app = Router::new()
        .route("/fail", any(write_then_fail))
        .route("/raw", any(write_then_raw))
        .with_state(common::create_test_state(pool.clone()));
    (TestServer::new(app).unwrap(), pool)
}

async fn user_count(pool: &SqlitePool, email: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_handler_error_rolls_back_earlier_write() {
    let (server, pool) = custom_server().await;

    let response = server.post("/fail").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>(), json!({ "error": "failed after writing" }));
    assert_eq!(user_count(&pool, "rolled-back@example.com").await, 0);
}

#[tokio::test]
async fn test_raw_reply_commits_and_skips_envelope() {
    let (server, pool) = custom_server().await;

    let response = server.post("/raw").await;

    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.text(), "exported as plain text");
    assert_eq!(user_count(&pool, "kept@example.com").await, 1);
}
