//! API route configuration.
//!
//! Every JSON resource is mounted with `any(...)` so that the dispatcher,
//! not the router, decides which methods exist and answers 405 in the
//! envelope format.

use axum::{
    Router,
    extract::{Path, Request, State, rejection::PathRejection},
    response::Response,
    routing::{any, get},
};

use crate::api::dispatch::{PathParams, dispatch, reject};
use crate::api::handlers::{IndexResource, SessionsResource, UsersResource, health_handler};
use crate::error::AppError;
use crate::state::AppState;

/// All API routes.
///
/// # Endpoints
///
/// - `GET                  /`                - resource index
/// - `GET, POST            /users`           - list / register or log in
/// - `GET, PUT, DELETE     /users/{user_id}` - one user (`me` for self)
/// - `POST                 /sessions`        - log in
/// - `GET                  /health`          - health check (not enveloped)
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", any(index))
        .route("/users", any(users_collection))
        .route("/users/{user_id}", any(users_item))
        .route("/sessions", any(sessions))
        .route("/health", get(health_handler))
}

async fn index(State(state): State<AppState>, request: Request) -> Response {
    dispatch(&IndexResource, &state, PathParams::new(), request).await
}

async fn users_collection(State(state): State<AppState>, request: Request) -> Response {
    dispatch(&UsersResource, &state, PathParams::new(), request).await
}

async fn users_item(
    State(state): State<AppState>,
    params: Result<Path<PathParams>, PathRejection>,
    request: Request,
) -> Response {
    match params {
        Ok(Path(params)) => dispatch(&UsersResource, &state, params, request).await,
        // An id that cannot even be decoded cannot exist.
        Err(rejection) => {
            tracing::debug!(%rejection, "Undecodable path parameter");
            reject(&UsersResource, &state, &request, AppError::NotFound(None))
        }
    }
}

async fn sessions(State(state): State<AppState>, request: Request) -> Response {
    dispatch(&SessionsResource, &state, PathParams::new(), request).await
}
