//! Domain error taxonomy and its mapping onto HTTP responses.
//!
//! Handlers and the record store raise [`AppError`] and never render it
//! themselves. The resource dispatcher is the single place that turns an
//! error into a status code and an `{"error": ...}` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error envelope returned for every non-2xx status.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {}", .0.as_deref().unwrap_or("-"))]
    BadRequest(Option<String>),

    /// Input named keys that are neither columns nor relations of the entity.
    #[error("unknown fields: {}", .0.join(", "))]
    UnknownField(Vec<String>),

    #[error("unauthorized: {}", .0.as_deref().unwrap_or("-"))]
    Unauthorized(Option<String>),

    #[error("access denied: {}", .0.as_deref().unwrap_or("-"))]
    AccessDenied(Option<String>),

    #[error("not found: {}", .0.as_deref().unwrap_or("-"))]
    NotFound(Option<String>),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(Some(message.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(Some(message.into()))
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(Some(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(Some(message.into()))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    /// Builds an [`AppError::UnknownField`] from any collection of keys.
    ///
    /// Keys are sorted so the message does not depend on map iteration order.
    pub fn unknown_fields<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        Self::UnknownField(keys)
    }

    /// Transport status for this error.
    ///
    /// | error | status |
    /// |---|---|
    /// | `BadRequest`, `UnknownField` | 400 |
    /// | `Unauthorized` | 401 |
    /// | `AccessDenied` | 403 |
    /// | `NotFound` | 404 |
    /// | `MethodNotAllowed` | 405 |
    /// | `Internal` | 500 |
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::UnknownField(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client.
    ///
    /// Falls back to the per-status default when the error carries no text.
    /// Detail of unexpected errors is only revealed when `expose_detail` is set.
    pub fn public_message(&self, expose_detail: bool) -> String {
        let (message, default) = match self {
            AppError::BadRequest(m) => (m.clone(), "bad request"),
            AppError::UnknownField(keys) => (unknown_fields_message(keys), "bad request"),
            AppError::Unauthorized(m) => (m.clone(), "unauthorized"),
            AppError::AccessDenied(m) => (m.clone(), "access denied"),
            AppError::NotFound(m) => (m.clone(), "not found"),
            AppError::MethodNotAllowed => (None, "method not allowed"),
            AppError::Internal(e) => {
                let detail = expose_detail.then(|| format!("{e:#}"));
                (detail, "unknown error")
            }
        };

        message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// Renders the error envelope.
    pub fn render(&self, expose_detail: bool) -> Response {
        let body = ErrorBody {
            error: self.public_message(expose_detail),
        };
        (self.status(), Json(body)).into_response()
    }

    /// Returns true for errors that indicate a bug or an infrastructure failure.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, AppError::Internal(_))
    }
}

fn unknown_fields_message(keys: &[String]) -> Option<String> {
    match keys {
        [] => None,
        [key] => Some(format!("Attribute {key} doesn't exist")),
        keys => Some(format!("Attributes {} don't exist", keys.join(", "))),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.render(false)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        map_sqlx_error(e)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = e.field_errors().into_keys().map(|k| k.to_string()).collect();
        fields.sort_unstable();
        AppError::bad_request(format!("Invalid value for: {}", fields.join(", ")))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::bad_request(format!("Malformed JSON body: {e}"))
    }
}

/// Maps a database error onto the domain taxonomy.
///
/// Unique violations are the client's fault; everything else is unexpected.
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    if let Some(db) = e.as_database_error()
        && db.is_unique_violation()
    {
        return AppError::bad_request("Record already exists");
    }

    if matches!(e, sqlx::Error::RowNotFound) {
        return AppError::NotFound(None);
    }

    AppError::Internal(anyhow::Error::new(e).context("Database error"))
}
