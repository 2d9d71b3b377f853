use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::Role;

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Role is taken as a string so an unknown value is a 400, not a body
/// rejection.
#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserAdminResponse {
    pub message: String,
    pub deleted_user_id: Uuid,
    pub deleted_username: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeRoleResponse {
    pub message: String,
    pub user_id: Uuid,
    pub username: String,
    pub new_role: Role,
}
