//! The authenticated caller of a request.

use uuid::Uuid;

use crate::domain::entities::User;

/// Who is making the request, resolved once per request from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl Identity {
    /// True when the caller is `subject` or an administrator.
    pub fn can_act_on(&self, subject: Uuid) -> bool {
        self.is_admin || self.id == subject
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}
