//! Bearer credentials: header parsing and identity resolution.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use sqlx::SqliteConnection;

use crate::application::services::TokenService;
use crate::domain::entities::User;
use crate::domain::identity::Identity;
use crate::error::AppError;
use crate::infrastructure::persistence::RecordStore;

/// Extracts the credential from `Authorization: Bearer <token>`.
///
/// Returns `Ok(None)` when the header is absent.
///
/// # Errors
///
/// [`AppError::BadRequest`] when the header is not exactly two
/// space-separated parts or the scheme is not `bearer` (any case).
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::bad_request("Wrong authorization header"))?;

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, credential] = parts.as_slice() else {
        return Err(AppError::bad_request("Wrong authorization header"));
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::bad_request("Wrong authorization token type"));
    }

    Ok(Some((*credential).to_string()))
}

/// Maps a credential onto a live user.
///
/// Expired, malformed or forged tokens and tokens of deleted users resolve to
/// `None`; the caller decides whether anonymity is acceptable.
pub async fn resolve_identity(
    conn: &mut SqliteConnection,
    tokens: &TokenService,
    token: &str,
) -> Result<Option<Identity>, AppError> {
    let subject = match tokens.resolve(token) {
        Ok(subject) => subject,
        Err(reason) => {
            tracing::debug!(%reason, "Bearer token rejected, continuing anonymously");
            return Ok(None);
        }
    };

    let user = RecordStore::<User>::new(conn).get_optional(subject).await?;
    if user.is_none() {
        tracing::debug!(%subject, "Token subject no longer exists");
    }

    Ok(user.as_ref().map(Identity::from))
}
