use axum::{
    extract::State,
    routing::{delete, get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser,
        extractors::{AdminUser, AuthUser},
        password::{hash_password_blocking, verify_password_blocking},
        repo_types::Role,
    },
    error::{AppError, AuthFailure},
    extract::{AppJson, AppPath},
    state::AppState,
};

use super::dto::{
    ChangeRoleResponse, DeleteUserAdminResponse, DeleteUserResponse, MessageResponse,
    PasswordChange, RoleChange,
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me).delete(delete_me))
        .route("/users/me/password", patch(change_password))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/role", patch(change_role))
}

#[instrument(skip(state, admin), fields(admin = %admin.0.username))]
pub async fn list_users(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, me), fields(user_id = %me.0.id))]
pub async fn get_me(
    State(state): State<AppState>,
    me: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .users
        .find_by_id(me.0.id)
        .await?
        .ok_or(AuthFailure::UnknownSubject)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, me, body), fields(user_id = %me.0.id))]
pub async fn change_password(
    State(state): State<AppState>,
    me: AuthUser,
    AppJson(body): AppJson<PasswordChange>,
) -> Result<Json<MessageResponse>, AppError> {
    let AuthUser(principal) = me;
    let user = state
        .users
        .find_by_id(principal.id)
        .await?
        .ok_or(AuthFailure::UnknownSubject)?;

    if !verify_password_blocking(body.current_password, user.password_hash).await? {
        warn!("password change with wrong current password");
        return Err(AppError::InvalidInput("Current password is incorrect".into()));
    }
    if body.new_password.is_empty() {
        return Err(AppError::InvalidInput("New password must not be empty".into()));
    }

    let hash = hash_password_blocking(body.new_password).await?;
    if !state.users.update_password_hash(principal.id, &hash).await? {
        return Err(AuthFailure::UnknownSubject.into());
    }

    info!("password updated");
    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}

#[instrument(skip(state, me), fields(user_id = %me.0.id))]
pub async fn delete_me(
    State(state): State<AppState>,
    me: AuthUser,
) -> Result<Json<DeleteUserResponse>, AppError> {
    let AuthUser(principal) = me;
    let removed = state
        .users
        .delete(principal.id)
        .await?
        .ok_or(AuthFailure::UnknownSubject)?;

    info!(username = %removed.username, "account self-deleted");
    Ok(Json(DeleteUserResponse {
        message: "Your account has been permanently deleted".into(),
        user_id: removed.id,
    }))
}

#[instrument(skip(state, admin), fields(admin = %admin.0.username))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DeleteUserAdminResponse>, AppError> {
    let AdminUser(admin) = admin;
    if id == admin.id {
        return Err(AppError::InvalidInput(
            "Use /api/v1/users/me to delete your own account".into(),
        ));
    }

    let removed = state
        .users
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    info!(deleted_user_id = %removed.id, username = %removed.username, "user deleted by admin");
    Ok(Json(DeleteUserAdminResponse {
        message: format!("User {} deleted successfully", removed.username),
        deleted_user_id: removed.id,
        deleted_username: removed.username,
    }))
}

#[instrument(skip(state, admin, body), fields(admin = %admin.0.username))]
pub async fn change_role(
    State(state): State<AppState>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<RoleChange>,
) -> Result<Json<ChangeRoleResponse>, AppError> {
    let role = Role::parse(&body.role).ok_or_else(|| {
        AppError::InvalidInput("Role must be one of: guest, member, admin".into())
    })?;

    let user = state
        .users
        .update_role(id, role)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    info!(target_user_id = %user.id, %role, "role changed");
    Ok(Json(ChangeRoleResponse {
        message: format!("User role updated to {}", role),
        user_id: user.id,
        username: user.username,
        new_role: role,
    }))
}
