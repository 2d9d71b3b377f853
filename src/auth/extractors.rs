use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo_types::Role},
    error::{AppError, AuthFailure},
    state::AppState,
};

/// The caller resolved for the current request.
///
/// `role` is the role stored for the user at resolution time, not the
/// snapshot inside the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

/// Raw token from `Authorization: Bearer <token>`, not yet verified.
pub struct BearerToken(pub String);

/// Any authenticated user, whatever the role.
pub struct AuthUser(pub Principal);

/// Authenticated user with role `admin`.
pub struct AdminUser(pub Principal);

/// Authenticated user with role `member` or `admin`.
#[allow(dead_code)]
pub struct MemberUser(pub Principal);

pub(crate) fn bearer_token(header: Option<&str>) -> Result<&str, AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AuthFailure::InvalidScheme)?;
    if token.is_empty() {
        return Err(AuthFailure::InvalidScheme);
    }
    Ok(token)
}

/// Verifies `token` and re-reads its subject from the store.
pub async fn resolve_principal(state: &AppState, token: &str) -> Result<Principal, AppError> {
    let claims = JwtKeys::from_ref(state).verify(token)?;

    let user = state
        .users
        .find_by_username(&claims.sub)
        .await?
        .ok_or(AuthFailure::UnknownSubject)?;

    debug!(user_id = %user.id, role = %user.role, "principal resolved");
    Ok(Principal {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

pub fn require_admin(principal: &Principal) -> Result<(), AppError> {
    if principal.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".into()))
    }
}

pub fn require_member(principal: &Principal) -> Result<(), AppError> {
    if principal.role.is_member() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Member access required".into()))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        Ok(BearerToken(bearer_token(header)?.to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        Ok(AuthUser(resolve_principal(state, &token).await?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        require_admin(&principal)?;
        Ok(AdminUser(principal))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MemberUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        require_member(&principal)?;
        Ok(MemberUser(principal))
    }
}
