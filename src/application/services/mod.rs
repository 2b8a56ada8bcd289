//! Application services.
//!
//! - [`TokenService`] - bearer token signing and verification
//! - [`UserService`] - login, registration and account lookup

pub mod token_service;
pub mod user_service;

pub use token_service::{IssuedToken, TokenError, TokenService};
pub use user_service::{Enrollment, UserService};
