//! # Resource API
//!
//! A generic JSON resource-serving layer built with Axum and SQLite.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - entity descriptors, sort specs, page windows
//! - **Application Layer** ([`application`]) - token signing, login and registration
//! - **Infrastructure Layer** ([`infrastructure`]) - the generic record store
//! - **API Layer** ([`api`]) - the resource dispatcher, resources and DTOs
//!
//! ## Features
//!
//! - Bearer authentication resolved once per request
//! - One transaction per request, committed on success only
//! - Uniform error mapping and `{"links", "items"}` envelopes with page links
//! - Declarative sort, filter and pagination shared by every entity
//!
//! ## Quick Start
//!
//! ```bash
//! export TOKEN_SIGNING_SECRET="change-me"
//! export DATABASE_URL="sqlite://resource-api.db"   # Optional
//!
//! # Create an administrator
//! cargo run --bin admin -- user create --email admin@example.com --admin
//!
//! # Start the service
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::api::dispatch::{Context, Reply, Resource, Verb, dispatch};
    pub use crate::application::services::{TokenService, UserService};
    pub use crate::domain::entities::User;
    pub use crate::domain::entity::{Entity, EntityDescriptor, Fields};
    pub use crate::error::AppError;
    pub use crate::infrastructure::persistence::{ListQuery, Predicate, RecordStore};
    pub use crate::state::{ApiSettings, AppState};
}
