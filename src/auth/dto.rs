use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::repo_types::User;

const MIN_PASSWORD_LEN: usize = 8;

fn check_email(email: &str) -> Result<(), AuthError> {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AuthError::Validation("Invalid email".into()))
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation("Password too short".into()));
    }
    Ok(())
}

/// Response envelope: every 2xx body is `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Normalize the email and check its shape before the service sees it.
    pub fn validated(mut self) -> Result<Self, AuthError> {
        self.email = self.email.trim().to_lowercase();
        check_email(&self.email)?;
        Ok(self)
    }
}

/// Request body for registration. Fields other than email and password are
/// collected into `profile` and stored alongside the user unchanged.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: serde_json::Map<String, serde_json::Value>,
}

impl RegisterRequest {
    pub fn validated(mut self) -> Result<Self, AuthError> {
        self.email = self.email.trim().to_lowercase();
        check_email(&self.email)?;
        check_password(&self.password)?;
        Ok(self)
    }
}

/// Request body for a password reset. The target user comes from the bearer
/// token, never from this body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

impl ResetPasswordRequest {
    pub fn validated(self) -> Result<Self, AuthError> {
        check_password(&self.password)?;
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
}

/// Public projection of a user. The password hash has no field here, so it
/// cannot leak through serialization.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub profile: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            profile: user.profile,
            created_at: user.created_at,
        }
    }
}
