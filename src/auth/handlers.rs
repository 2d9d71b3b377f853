use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginForm, PublicUser, RegisterRequest, TokenResponse},
        extractors::BearerToken,
        jwt::JwtKeys,
        services::{check_credentials, register_user},
    },
    error::AppError,
    extract::{AppForm, AppJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = register_user(state.users.as_ref(), payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = check_credentials(state.users.as_ref(), &form.username, &form.password).await?;

    let access_token = JwtKeys::from_ref(&state).issue(&user.username, user.role)?;

    info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok(Json(TokenResponse::bearer(access_token)))
}

/// Echoes the presented token back unchanged once it verifies. Tokens are
/// not rotated.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<TokenResponse>, AppError> {
    JwtKeys::from_ref(&state).verify(&token)?;
    Ok(Json(TokenResponse::bearer(token)))
}
