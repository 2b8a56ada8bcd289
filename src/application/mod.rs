//! Application layer services.
//!
//! Services coordinate the record store and domain rules and provide a
//! small API for resource handlers and the admin CLI.
//!
//! - [`services::token_service::TokenService`] - bearer token signing
//! - [`services::user_service::UserService`] - login and registration

pub mod services;
