//! The contract every resource implements.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::Method;

use super::context::Context;
use super::reply::Reply;
use crate::error::AppError;

/// Path parameters captured by the router.
pub type PathParams = HashMap<String, String>;

/// HTTP methods the dispatcher routes to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn from_method(method: &Method) -> Option<Self> {
        match method.as_str().to_ascii_lowercase().as_str() {
            "get" => Some(Verb::Get),
            "head" => Some(Verb::Head),
            "post" => Some(Verb::Post),
            "put" => Some(Verb::Put),
            "delete" => Some(Verb::Delete),
            _ => None,
        }
    }

    /// The verb whose handler serves this one. HEAD is answered by GET.
    pub fn handler(self) -> Self {
        match self {
            Verb::Head => Verb::Get,
            other => other,
        }
    }

    /// GET and HEAD read lists and take pagination parameters.
    pub fn is_read(self) -> bool {
        matches!(self, Verb::Get | Verb::Head)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Head => "head",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Delete => "delete",
        }
    }
}

/// A JSON resource served through the dispatcher.
///
/// Handlers return domain errors unchanged; mapping them onto statuses,
/// the transaction boundary and the envelope all belong to the dispatcher.
/// Unimplemented verbs answer 405.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Whether a handler exists for `verb` on this path. Checked before any
    /// other work so a 405 costs nothing.
    fn allows(&self, verb: Verb, params: &PathParams) -> bool;

    /// Whether the route needs an authenticated caller. Anonymous requests
    /// to such routes fail with 401.
    fn requires_identity(&self, verb: Verb, params: &PathParams) -> bool {
        let _ = (verb, params);
        false
    }

    async fn get(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let _ = ctx;
        Err(AppError::MethodNotAllowed)
    }

    async fn post(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let _ = ctx;
        Err(AppError::MethodNotAllowed)
    }

    async fn put(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let _ = ctx;
        Err(AppError::MethodNotAllowed)
    }

    async fn delete(&self, ctx: &mut Context) -> Result<Reply, AppError> {
        let _ = ctx;
        Err(AppError::MethodNotAllowed)
    }
}
