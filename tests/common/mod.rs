#![allow(dead_code)]

use axum_test::TestServer;
use chrono::Duration;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use resource_api::application::services::TokenService;
use resource_api::domain::entities::User;
use resource_api::domain::entity::Fields;
use resource_api::infrastructure::persistence::RecordStore;
use resource_api::routes::api_router;
use resource_api::state::{ApiSettings, AppState};

pub const SIGNING_SECRET: &[u8] = b"test-signing-secret";
pub const PASSWORD: &str = "correct horse";

/// A fresh migrated in-memory database.
///
/// One connection only: every connection to `sqlite::memory:` would open
/// its own empty database.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_tokens() -> TokenService {
    TokenService::new(SIGNING_SECRET, Duration::days(14)).unwrap()
}

pub fn create_test_state(pool: SqlitePool) -> AppState {
    AppState::new(pool, test_tokens(), ApiSettings::default())
}

pub fn make_server(state: AppState) -> TestServer {
    TestServer::new(api_router(state)).unwrap()
}

/// Server plus the pool behind it, for seeding.
pub async fn setup() -> (TestServer, SqlitePool) {
    let pool = create_test_pool().await;
    let server = make_server(create_test_state(pool.clone()));
    (server, pool)
}

pub async fn seed_user(pool: &SqlitePool, email: &str, is_admin: bool) -> User {
    seed_user_with(
        pool,
        json!({ "email": email, "password": PASSWORD, "is_admin": is_admin }),
    )
    .await
}

pub async fn seed_user_with(pool: &SqlitePool, fields: Value) -> User {
    let fields: Fields = match fields {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    };
    let mut conn = pool.acquire().await.unwrap();
    RecordStore::<User>::new(&mut conn)
        .create(&fields)
        .await
        .unwrap()
}

pub async fn soft_delete(pool: &SqlitePool, user: &User) {
    let mut conn = pool.acquire().await.unwrap();
    RecordStore::<User>::new(&mut conn)
        .delete(user.id)
        .await
        .unwrap();
}

/// `Authorization` header value for `user`.
pub fn bearer(user: &User) -> String {
    format!("Bearer {}", test_tokens().issue(user.id).token)
}
