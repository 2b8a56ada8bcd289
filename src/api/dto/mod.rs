//! Data Transfer Objects for request parsing and response bodies.

pub mod health;
pub mod pagination;
pub mod session;
pub mod user;

pub use pagination::PaginationParams;
pub use session::Credentials;
pub use user::{AccessToken, UserView};
