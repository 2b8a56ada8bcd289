//! Login request body.

use serde::Deserialize;
use validator::Validate;

/// Credentials posted to `/sessions`.
#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1))]
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}
