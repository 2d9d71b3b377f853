use tracing::{info, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
        repo::UserRepo,
        repo_types::{NewUser, Role, User},
    },
    error::{AppError, AuthFailure},
};

/// Creates a `member` account.
///
/// Uniqueness is pre-checked for a friendly error, but the store's own
/// constraint is what settles a race between two registrations.
pub async fn register_user(repo: &dyn UserRepo, req: RegisterRequest) -> Result<User, AppError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("All fields are required".into()));
    }

    if repo
        .find_by_username_or_email(&req.username, &req.email)
        .await?
        .is_some()
    {
        warn!(username = %req.username, "username or email already registered");
        return Err(AppError::Conflict("Username or email already registered".into()));
    }

    let password_hash = hash_password_blocking(req.password).await?;
    let user = repo
        .insert(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: Role::Member,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Looks up `username` and checks `password`.
///
/// An unknown username and a wrong password produce the same error.
pub async fn check_credentials(
    repo: &dyn UserRepo,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let Some(user) = repo.find_by_username(username).await? else {
        warn!(username, "login for unknown username");
        verify_dummy_blocking(password.to_string()).await?;
        return Err(AuthFailure::BadCredentials.into());
    };

    if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AuthFailure::BadCredentials.into());
    }

    Ok(user)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    Promoted,
    AlreadyAdmin,
}

/// Makes `username` an administrator: promotes it if it exists, otherwise
/// creates it with `email` and `password`. Safe to run repeatedly.
///
/// An existing account keeps its password; only the role changes.
pub async fn ensure_admin(
    repo: &dyn UserRepo,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(BootstrapOutcome, User), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::InvalidInput("admin username is required".into()));
    }

    if let Some(existing) = repo.find_by_username(username).await? {
        if existing.role == Role::Admin {
            return Ok((BootstrapOutcome::AlreadyAdmin, existing));
        }
        let promoted = repo
            .update_role(existing.id, Role::Admin)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        info!(user_id = %promoted.id, username, "existing user promoted to admin");
        return Ok((BootstrapOutcome::Promoted, promoted));
    }

    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "admin email and password are required to create the account".into(),
        ));
    }

    let password_hash = hash_password_blocking(password.to_string()).await?;
    let created = repo
        .insert(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await?;
    info!(user_id = %created.id, username, "admin user created");
    Ok((BootstrapOutcome::Created, created))
}
