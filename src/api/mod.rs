//! REST API layer.
//!
//! # Modules
//!
//! - [`dispatch`] - the resource dispatcher: identity, transaction, errors, envelope
//! - [`dto`] - request and response bodies
//! - [`handlers`] - resources and plain handlers
//! - [`middleware`] - request tracing
//! - [`routes`] - route table

pub mod dispatch;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
