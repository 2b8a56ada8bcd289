//! What a handler hands back to the dispatcher.

use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug)]
pub enum Payload {
    /// Success without items: the envelope carries only `links`.
    Empty,
    One(Value),
    Many(Vec<Value>),
    /// Bypasses the envelope entirely.
    Raw(Response),
}

/// A handler result before rendering.
#[derive(Debug)]
pub struct Reply {
    pub(crate) payload: Payload,
    /// Overrides the verb's default status (201 for POST, 200 otherwise).
    pub(crate) status: Option<StatusCode>,
    /// Explicit next page; suppresses the automatic full-page rule.
    pub(crate) next_page: Option<u32>,
    /// Canonical URL of a created resource, sent as `Location`.
    pub(crate) location: Option<String>,
}

impl Reply {
    fn new(payload: Payload) -> Self {
        Self {
            payload,
            status: None,
            next_page: None,
            location: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Payload::Empty)
    }

    /// # Errors
    ///
    /// [`AppError::Internal`] if `item` cannot be represented as JSON.
    pub fn one<T: Serialize>(item: T) -> Result<Self, AppError> {
        Ok(Self::new(Payload::One(to_value(item)?)))
    }

    pub fn many<T, I>(items: I) -> Result<Self, AppError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let items = items.into_iter().map(to_value).collect::<Result<_, _>>()?;
        Ok(Self::new(Payload::Many(items)))
    }

    pub fn raw(response: Response) -> Self {
        Self::new(Payload::Raw(response))
    }

    /// Answers 200 where the verb defaults to 201, e.g. a POST that found
    /// an existing record. Error statuses only come from [`AppError`].
    pub fn with_ok_status(mut self) -> Self {
        self.status = Some(StatusCode::OK);
        self
    }

    pub fn with_next_page(mut self, page: u32) -> Self {
        self.next_page = Some(page);
        self
    }

    pub fn with_location(mut self, url: impl Into<String>) -> Self {
        self.location = Some(url.into());
        self
    }
}

// Serialization failures surface as 500.
fn to_value<T: Serialize>(item: T) -> Result<Value, AppError> {
    serde_json::to_value(item)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("Failed to serialize reply")))
}
