//! Client-side form validation.
//!
//! Forms hold raw user input as strings. Validating a form yields the typed
//! payload sent to the library service, or a [`FormError`] with one message
//! per offending field. The rules and wording follow the service's own
//! validation so the same messages appear whichever side catches the problem.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};

use super::email::Email;

/// Field name → message.
pub type FieldErrors = BTreeMap<String, String>;

/// One or more form fields failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_messages(.fields))]
pub struct FormError {
    /// Messages keyed by field name.
    pub fields: FieldErrors,
}

impl FormError {
    /// Build an error for a single field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), message.into());
        Self { fields }
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// `Ok(())` when no field failed.
    pub(crate) fn check(fields: FieldErrors) -> Result<(), Self> {
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Self { fields })
        }
    }
}

fn join_messages(fields: &FieldErrors) -> String {
    fields.values().cloned().collect::<Vec<_>>().join(" ")
}

/// Message shown when a password does not meet the strength rule.
pub const PASSWORD_RULE: &str = "Password must be at least 8 characters and contain one uppercase letter, one number, and one special character.";

const MIN_PASSWORD_LENGTH: usize = 8;

/// Returns `true` if `password` satisfies the service's strength rule:
/// at least 8 characters, one uppercase letter, one digit and one
/// non-alphanumeric character.
#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_ascii_alphanumeric())
}

pub(crate) fn serialize_secret<S: Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

// =============================================================================
// Login
// =============================================================================

/// Raw login form input.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Validated login payload (`POST /auth/login`).
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: Email,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

impl LoginForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] when the email or password is missing.
    pub fn validate(&self) -> Result<LoginCredentials, FormError> {
        let mut fields = FieldErrors::new();

        let email = Email::parse(&self.email);
        if let Err(e) = &email {
            fields.insert("email".to_string(), e.to_string());
        }
        if self.password.is_empty() {
            fields.insert("password".to_string(), "Password is required.".to_string());
        }

        FormError::check(fields)?;
        Ok(LoginCredentials {
            email: email.map_err(|e| FormError::single("email", e.to_string()))?,
            password: SecretString::from(self.password.clone()),
        })
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Raw registration form input.
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Validated registration payload (`POST /auth/register`).
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
}

impl Registration {
    /// Credentials for logging in as the newly registered account.
    #[must_use]
    pub fn login_credentials(&self) -> LoginCredentials {
        LoginCredentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

impl RegisterForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] listing every field that failed: a blank name,
    /// a missing or malformed email, or a missing or weak password.
    pub fn validate(&self) -> Result<Registration, FormError> {
        let mut fields = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            fields.insert("name".to_string(), "Name is required.".to_string());
        }

        let email = Email::parse(&self.email);
        if let Err(e) = &email {
            fields.insert("email".to_string(), e.to_string());
        }

        if self.password.is_empty() {
            fields.insert("password".to_string(), "Password is required.".to_string());
        } else if !is_strong_password(&self.password) {
            fields.insert("password".to_string(), PASSWORD_RULE.to_string());
        }

        FormError::check(fields)?;
        Ok(Registration {
            name: name.to_string(),
            email: email.map_err(|e| FormError::single("email", e.to_string()))?,
            password: SecretString::from(self.password.clone()),
        })
    }
}
