//! User representations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::IssuedToken;
use crate::domain::entities::User;

/// Public representation of a user. Never carries the password.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub url: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub is_admin: bool,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
}

impl UserView {
    /// `url` is the absolute canonical URL of the user.
    pub fn new(user: &User, url: String) -> Self {
        Self {
            id: user.id,
            url,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            is_admin: user.is_admin,
            created_date: user.created_date,
            modified_date: user.modified_date,
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: IssuedToken) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// `{"access_token", "token_type": "Bearer", "expires"}`
#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires: DateTime<Utc>,
}

impl From<IssuedToken> for AccessToken {
    fn from(token: IssuedToken) -> Self {
        Self {
            access_token: token.token,
            token_type: "Bearer",
            expires: token.expires,
        }
    }
}
