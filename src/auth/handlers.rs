use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    ApiResponse, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    ResetPasswordRequest,
};
use crate::auth::error::AuthError;
use crate::auth::extractors::AuthUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::service;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/reset-password", post(reset_password))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    let req = payload.validated()?;
    let keys = JwtKeys::from_ref(&state);
    let data = service::login(&state.db, &keys, req).await?;
    Ok(Json(ApiResponse { data }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), AuthError> {
    let req = payload.validated()?;
    let keys = JwtKeys::from_ref(&state);
    let data = service::register(&state.db, &keys, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse { data })))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AuthError> {
    let req = payload.validated()?;
    service::reset_password(&state.db, user_id, req.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
