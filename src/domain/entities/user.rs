use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::domain::entity::{
    Entity, EntityDescriptor, Field, FieldKind, FieldValue, SortResolver,
};
use crate::error::AppError;
use crate::utils::password;

/// An account that can authenticate against the API.
///
/// `password` holds an Argon2 PHC string, never plaintext.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub deleted: Option<DateTime<Utc>>,
}

static USER_FIELDS: [Field; 5] = [
    Field::new("email", FieldKind::Text).required(),
    Field::new("password", FieldKind::Text).required().unsortable(),
    Field::new("is_admin", FieldKind::Boolean).not_null(),
    Field::new("first_name", FieldKind::Text),
    Field::new("last_name", FieldKind::Text),
];

static USER: EntityDescriptor = EntityDescriptor {
    table: "users",
    fields: &USER_FIELDS,
    relations: &[],
    sort_resolvers: &[SortResolver {
        name: "name",
        columns: &["last_name", "first_name"],
    }],
    default_sort: Some("-created_date"),
    soft_delete: Some("deleted"),
};

impl User {
    /// First and last name joined, or `User <id>` when both are empty.
    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            format!("User {}", self.id)
        } else {
            parts.join(" ")
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        password::verify_password(candidate, &self.password)
    }
}

impl Entity for User {
    fn descriptor() -> &'static EntityDescriptor {
        &USER
    }

    fn id(&self) -> Uuid {
        self.id
    }

    /// Normalises and validates e-mail addresses and hashes passwords.
    fn prepare(field: &Field, value: FieldValue) -> Result<FieldValue, AppError> {
        match (field.name, value) {
            ("email", FieldValue::Text(email)) => {
                let email = email.trim().to_lowercase();
                if !email.validate_email() {
                    return Err(AppError::bad_request("Invalid value for: email"));
                }
                Ok(FieldValue::Text(email))
            }
            ("password", FieldValue::Text(plain)) => {
                Ok(FieldValue::Text(password::hash_password(&plain)?))
            }
            (_, value) => Ok(value),
        }
    }
}
