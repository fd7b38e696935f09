//! User accounts and the authenticated identity.

use chrono::NaiveDateTime;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::form::{FieldErrors, FormError, serialize_secret};
use super::id::UserId;
use super::status::Role;

/// The authenticated account, as returned by login and `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    /// Returns `true` if the identity has the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// A user account as listed by the admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

/// Admin payload for creating an account (`POST /admin/users`).
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    pub role: Role,
}

impl NewUser {
    /// Validate raw admin input.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] when the name, email or password is missing,
    /// or the email is malformed.
    pub fn parse(name: &str, email: &str, password: &str, role: Role) -> Result<Self, FormError> {
        let mut fields = FieldErrors::new();

        let name = name.trim();
        if name.is_empty() {
            fields.insert("name".to_string(), "Name is required.".to_string());
        }
        let parsed_email = Email::parse(email);
        if let Err(e) = &parsed_email {
            fields.insert("email".to_string(), e.to_string());
        }
        if password.is_empty() {
            fields.insert("password".to_string(), "Password is required.".to_string());
        }

        FormError::check(fields)?;
        Ok(Self {
            name: name.to_string(),
            email: parsed_email.map_err(|e| FormError::single("email", e.to_string()))?,
            password: SecretString::from(password.to_string()),
            role,
        })
    }
}
