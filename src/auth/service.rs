//! Credential verification and token issuance. Handlers hand in validated
//! requests; everything that touches the store, the hash, or the signing
//! key happens here.

use sqlx::PgPool;
use tokio::task;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::{
    LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse,
};
use crate::auth::error::AuthError;
use crate::auth::jwt::JwtKeys;
use crate::auth::password;
use crate::auth::repo_types::User;

/// Postgres unique-violation, raised when two registrations race on the
/// same email. Exactly one insert wins; the loser surfaces as `EmailTaken`.
const UNIQUE_VIOLATION: &str = "23505";

#[instrument(skip_all, fields(email = %req.email))]
pub async fn login(
    db: &PgPool,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<LoginResponse, AuthError> {
    let user = match User::find_by_email(db, &req.email).await? {
        Some(user) => user,
        None => {
            warn!("login with unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        token,
        user: PublicUser::from(user),
    })
}

#[instrument(skip_all, fields(email = %req.email))]
pub async fn register(
    db: &PgPool,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<RegisterResponse, AuthError> {
    let hash = hash_blocking(req.password).await?;
    let profile = serde_json::Value::Object(req.profile);

    let user = match User::create(db, &req.email, &hash, &profile).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            warn!("email already registered");
            return Err(AuthError::EmailTaken);
        }
        Err(e) => return Err(e.into()),
    };

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user registered");
    Ok(RegisterResponse { token })
}

/// `user_id` must come from a verified bearer token, never from the
/// request body.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn reset_password(
    db: &PgPool,
    user_id: Uuid,
    new_password: String,
) -> Result<(), AuthError> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let hash = hash_blocking(new_password).await?;
    let updated = User::update_password(db, user.id, &hash).await?;
    if updated == 0 {
        // User vanished between lookup and update.
        warn!("password reset raced with user deletion");
        return Err(AuthError::UserNotFound);
    }
    info!("password reset");
    Ok(())
}

// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(plain: String) -> Result<String, AuthError> {
    task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| AuthError::Internal(e.into()))?
        .map_err(AuthError::Internal)
}

async fn verify_blocking(plain: String, hash: String) -> Result<bool, AuthError> {
    task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| AuthError::Internal(e.into()))?
        .map_err(AuthError::Internal)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}
