use serde::{Deserialize, Serialize};

use crate::auth::repo_types::Role;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // username
    pub role: Role,  // role snapshot at issue time
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Payload as decoded from an untrusted token, before required claims are
/// checked.
#[derive(Debug, Deserialize)]
pub(super) struct RawClaims {
    pub sub: Option<String>,
    pub role: Option<Role>,
    pub iat: Option<usize>,
    pub exp: Option<usize>,
    pub iss: Option<String>,
    pub aud: Option<String>,
}
