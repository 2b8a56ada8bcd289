//! The resource dispatcher.
//!
//! Every JSON resource is served through [`dispatch`], which runs one request
//! through these steps:
//!
//! 1. **Received** - method, path parameters, query and body are captured.
//!    Unknown methods and verbs the resource does not handle are answered
//!    with 405 before anything else happens.
//! 2. **IdentityResolved** - the bearer token, if any, is resolved inside the
//!    request transaction. Rejected tokens mean "anonymous"; routes that
//!    require an identity then fail with 401.
//! 3. **Routed** - the lower-cased method selects the handler; HEAD runs GET.
//! 4. **Executed** - the handler runs in one transaction, committed on
//!    success and rolled back on any error.
//! 5. **Rendered** - the reply becomes a `{"links", "items"?}` envelope, an
//!    error becomes `{"error"}`.

pub mod auth;
pub mod context;
pub mod envelope;
pub mod reply;
pub mod resource;

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{Query, Request};
use axum::http::{HeaderValue, StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use url::Url;

pub use context::{Context, Origin, parse_id};
pub use envelope::{Envelope, LinkBuilder, Links};
pub use reply::{Payload, Reply};
pub use resource::{PathParams, Resource, Verb};

use crate::api::dto::pagination::PaginationParams;
use crate::domain::page::PageWindow;
use crate::error::AppError;
use crate::state::AppState;

/// Largest request body read into memory.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Runs `request` through `resource` and renders the outcome.
///
/// Never fails: every error is mapped onto its status and rendered here.
pub async fn dispatch<R: Resource>(
    resource: &R,
    state: &AppState,
    params: PathParams,
    request: Request,
) -> Response {
    let name = resource.name();
    let is_head = Verb::from_method(request.method()) == Some(Verb::Head);

    let result = execute(resource, state, params, request).await;
    finish(name, state, is_head, result)
}

/// Renders `error` for a request that never reached `resource`, such as one
/// whose path parameters could not be decoded.
pub fn reject<R: Resource>(
    resource: &R,
    state: &AppState,
    request: &Request,
    error: AppError,
) -> Response {
    let is_head = Verb::from_method(request.method()) == Some(Verb::Head);
    finish(resource.name(), state, is_head, Err(error))
}

/// Logs and renders errors, counts the request and strips HEAD bodies.
fn finish(
    name: &'static str,
    state: &AppState,
    is_head: bool,
    result: Result<Response, AppError>,
) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(error) => {
            if error.is_unexpected() {
                tracing::error!(resource = name, error = ?error, "Unexpected error");
            } else {
                tracing::warn!(
                    resource = name,
                    status = error.status().as_u16(),
                    error = %error,
                    "Request rejected"
                );
            }
            error.render(state.settings.debug)
        }
    };

    metrics::counter!(
        "resource_requests_total",
        "resource" => name,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    if is_head {
        let (parts, _) = response.into_parts();
        return Response::from_parts(parts, Body::empty());
    }

    response
}

async fn execute<R: Resource>(
    resource: &R,
    state: &AppState,
    params: PathParams,
    request: Request,
) -> Result<Response, AppError> {
    let verb = Verb::from_method(request.method()).ok_or(AppError::MethodNotAllowed)?;
    let handler = verb.handler();
    if !resource.allows(handler, &params) {
        return Err(AppError::MethodNotAllowed);
    }

    tracing::debug!(resource = resource.name(), verb = verb.as_str(), "Request received");

    let (parts, body) = request.into_parts();

    let token = auth::bearer_token(&parts.headers)?;

    let window = if verb.is_read() {
        Some(page_window(&parts.uri, state.settings.default_limit)?)
    } else {
        None
    };

    let query: Vec<(String, String)> = parts
        .uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::bad_request("Request body is too large or unreadable"))?;

    let origin = Origin::from_request(&parts.headers, &parts.uri);
    let base = Url::parse(&origin.url_for(parts.uri.path()))
        .map_err(|_| AppError::bad_request("Invalid Host header"))?;
    let links = LinkBuilder::new(base, query.clone());

    let mut tx = state.pool.begin().await?;

    let identity = match token {
        Some(token) => auth::resolve_identity(&mut tx, &state.tokens, &token).await?,
        None => None,
    };
    if identity.is_none() && resource.requires_identity(handler, &params) {
        return Err(AppError::Unauthorized(None));
    }

    tracing::debug!(
        resource = resource.name(),
        user_id = ?identity.as_ref().map(|i| i.id),
        "Identity resolved"
    );

    let mut ctx = Context {
        params,
        query,
        headers: parts.headers,
        body,
        identity,
        window,
        origin,
        links,
        tokens: state.tokens.clone(),
        tx,
    };

    let result = match handler {
        Verb::Get | Verb::Head => resource.get(&mut ctx).await,
        Verb::Post => resource.post(&mut ctx).await,
        Verb::Put => resource.put(&mut ctx).await,
        Verb::Delete => resource.delete(&mut ctx).await,
    };

    match result {
        Ok(reply) => {
            ctx.tx.commit().await?;
            tracing::debug!(resource = resource.name(), "Transaction committed");
            Ok(render(reply, verb, ctx.window, &ctx.links))
        }
        Err(error) => {
            if let Err(e) = ctx.tx.rollback().await {
                tracing::warn!(error = %e, "Rollback failed");
            }
            Err(error)
        }
    }
}

/// Parses `limit` and `page` from the query string.
fn page_window(uri: &axum::http::Uri, default_limit: u32) -> Result<PageWindow, AppError> {
    let Query(params) = Query::<PaginationParams>::try_from_uri(uri)
        .map_err(|_| AppError::bad_request("Invalid pagination parameters"))?;
    params.window(default_limit)
}

/// Builds the success envelope.
fn render(reply: Reply, verb: Verb, window: Option<PageWindow>, links: &LinkBuilder) -> Response {
    let Reply {
        payload,
        status,
        next_page: explicit_next,
        location,
    } = reply;

    let items = match payload {
        Payload::Raw(response) => return response,
        Payload::Empty => None,
        Payload::One(item) => Some(vec![item]),
        Payload::Many(items) => Some(items),
    };

    let status = status.unwrap_or(if verb == Verb::Post {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    });

    let mut next = explicit_next;
    let mut prev = None;
    if let Some(window) = window {
        if next.is_none()
            && let Some(items) = &items
        {
            next = window.next_page_after(items.len());
        }
        prev = window.prev_page();
    }

    let envelope = Envelope {
        links: Links {
            self_: links.current(),
            prev: prev.map(|p| links.with_page(p)),
            next: next.map(|p| links.with_page(p)),
        },
        items,
    };

    let mut response = (status, Json(envelope)).into_response();

    if let Some(location) = location {
        match HeaderValue::from_str(&location) {
            Ok(value) => {
                response.headers_mut().insert(LOCATION, value);
            }
            Err(_) => tracing::warn!(%location, "Location is not a valid header value"),
        }
    }

    response
}
