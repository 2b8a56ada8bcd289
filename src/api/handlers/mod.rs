//! HTTP handlers.
//!
//! Resources ([`users`], [`sessions`], [`index`]) implement
//! [`Resource`](crate::api::dispatch::Resource) and are served through the
//! dispatcher. [`health`] is a plain axum handler outside the envelope.

pub mod health;
pub mod index;
pub mod sessions;
pub mod users;

pub use health::health_handler;
pub use index::IndexResource;
pub use sessions::SessionsResource;
pub use users::UsersResource;
