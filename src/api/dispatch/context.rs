//! Per-request state handed to resource handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Uri};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use uuid::Uuid;

use super::envelope::LinkBuilder;
use super::resource::PathParams;
use crate::application::services::TokenService;
use crate::domain::entity::{Entity, Fields};
use crate::domain::identity::Identity;
use crate::domain::page::PageWindow;
use crate::domain::sort::SortSpec;
use crate::error::AppError;
use crate::infrastructure::persistence::RecordStore;

/// Scheme and authority the client used to reach us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
}

impl Origin {
    /// Honours `X-Forwarded-Proto`, then the `Host` header, then the request
    /// URI authority.
    pub fn from_request(headers: &HeaderMap, uri: &Uri) -> Self {
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| uri.scheme_str().unwrap_or("http").to_string());

        let host = headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Self { scheme, host }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }
}

/// Everything a handler may look at, plus the request transaction.
pub struct Context {
    pub(crate) params: PathParams,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) identity: Option<Identity>,
    pub(crate) window: Option<PageWindow>,
    pub(crate) origin: Origin,
    pub(crate) links: LinkBuilder,
    pub(crate) tokens: Arc<TokenService>,
    pub(crate) tx: Transaction<'static, Sqlite>,
}

impl Context {
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// # Errors
    ///
    /// [`AppError::Unauthorized`] for anonymous callers.
    pub fn require_identity(&self) -> Result<&Identity, AppError> {
        self.identity.as_ref().ok_or(AppError::Unauthorized(None))
    }

    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(|i| i.is_admin)
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The page window of a GET/HEAD request, unlimited for other verbs.
    pub fn window(&self) -> PageWindow {
        self.window.unwrap_or_else(PageWindow::unlimited)
    }

    /// The `sort` query parameter, if any.
    ///
    /// # Errors
    ///
    /// [`AppError::BadRequest`] when the parameter is malformed.
    pub fn sort(&self) -> Result<Option<SortSpec>, AppError> {
        match self.query_param("sort").map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => SortSpec::parse(raw).map(Some),
        }
    }

    /// The body as a JSON object. An empty body is an empty object.
    ///
    /// # Errors
    ///
    /// [`AppError::BadRequest`] for invalid JSON or a non-object body.
    pub fn fields(&self) -> Result<Fields, AppError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Fields::new());
        }
        match serde_json::from_slice::<Value>(&self.body)? {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::bad_request("Request body must be a JSON object")),
        }
    }

    /// The body deserialized into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The request's connection, inside its transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// A record store bound to the request transaction.
    pub fn store<E: Entity>(&mut self) -> RecordStore<'_, E> {
        RecordStore::new(&mut self.tx)
    }

    /// Absolute URL of `path` as seen by the client.
    pub fn url_for(&self, path: &str) -> String {
        self.origin.url_for(path)
    }
}

/// Parses an id path parameter. Ids that are not UUIDs cannot exist.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(None))
}
