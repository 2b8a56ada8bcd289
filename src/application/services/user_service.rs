//! Account lookup, login and registration.
//!
//! Shared by the `users` and `sessions` resources and by the admin CLI.

use serde_json::Value;
use sqlx::SqliteConnection;

use crate::domain::entities::User;
use crate::domain::entity::{Fields, reject_unknown};
use crate::domain::identity::Identity;
use crate::error::AppError;
use crate::infrastructure::persistence::{ListQuery, Predicate, RecordStore};

/// Outcome of [`UserService::register_or_authenticate`].
#[derive(Debug)]
pub enum Enrollment {
    /// A new account was created.
    Registered(User),
    /// The credentials matched an existing account.
    Authenticated(User),
}

impl Enrollment {
    pub fn into_user(self) -> User {
        match self {
            Enrollment::Registered(u) | Enrollment::Authenticated(u) => u,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Enrollment::Registered(_))
    }
}

/// User operations over one borrowed connection.
pub struct UserService<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserService<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Looks an account up by e-mail, case-insensitively.
    ///
    /// Soft-deleted accounts are only returned when `including_deleted` is set.
    pub async fn find_by_email(
        &mut self,
        email: &str,
        including_deleted: bool,
    ) -> Result<Option<User>, AppError> {
        let mut store = RecordStore::<User>::new(&mut *self.conn);
        if including_deleted {
            store = store.including_deleted();
        }

        let query = ListQuery::new().filter(Predicate::eq("email", normalize_email(email)));
        Ok(store.all(&query).await?.into_iter().next())
    }

    /// Checks an e-mail/password pair.
    ///
    /// # Errors
    ///
    /// [`AppError::Unauthorized`] for unknown, deleted or mismatching
    /// credentials, with one message for all three.
    pub async fn authenticate(&mut self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .find_by_email(email, false)
            .await?
            .filter(|u| u.check_password(password));

        user.ok_or_else(|| AppError::unauthorized("Wrong email or password"))
    }

    /// Logs in when the e-mail is known, registers otherwise.
    ///
    /// Only administrators may set `is_admin`. An e-mail that belongs to a
    /// soft-deleted account can neither log in nor register again.
    ///
    /// # Errors
    ///
    /// - [`AppError::UnknownField`] for keys that are not user fields
    /// - [`AppError::AccessDenied`] when a non-admin sets `is_admin`
    /// - [`AppError::Unauthorized`] for a wrong password or a deleted account
    /// - [`AppError::BadRequest`] for invalid registration data
    pub async fn register_or_authenticate(
        &mut self,
        fields: &Fields,
        caller: Option<&Identity>,
    ) -> Result<Enrollment, AppError> {
        reject_unknown::<User>(fields)?;

        if fields.contains_key("is_admin") && !caller.is_some_and(|c| c.is_admin) {
            return Err(AppError::access_denied(
                "Only administrators can grant administrator rights",
            ));
        }

        let email = fields.get("email").and_then(Value::as_str).unwrap_or_default();
        if !email.is_empty()
            && let Some(existing) = self.find_by_email(email, true).await?
        {
            if existing.is_deleted() {
                tracing::warn!(user_id = %existing.id, "Login attempt for a deleted account");
                return Err(AppError::unauthorized("Account is disabled"));
            }

            let password = fields.get("password").and_then(Value::as_str).unwrap_or_default();
            if !existing.check_password(password) {
                return Err(AppError::unauthorized("Wrong email or password"));
            }

            tracing::debug!(user_id = %existing.id, "User authenticated");
            return Ok(Enrollment::Authenticated(existing));
        }

        let user = RecordStore::<User>::new(&mut *self.conn)
            .create(fields)
            .await?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok(Enrollment::Registered(user))
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
