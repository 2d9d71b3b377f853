use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{
    auth::{
        claims::{Claims, RawClaims},
        repo_types::Role,
    },
    config::{JwtConfig, MAX_TTL_MINUTES},
    state::AppState,
};

/// Why a presented token was refused.
///
/// Every variant maps to the same 401 response; the distinction exists for
/// logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token is missing the `{0}` claim")]
    MissingClaim(String),
}

impl From<jsonwebtoken::errors::Error> for TokenRejection {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenRejection::BadSignature,
            ErrorKind::ExpiredSignature => TokenRejection::Expired,
            ErrorKind::MissingRequiredClaim(claim) => TokenRejection::MissingClaim(claim.clone()),
            _ => TokenRejection::Malformed,
        }
    }
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64 * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

impl JwtKeys {
    /// Issues a token for `subject` valid for the configured ttl.
    pub fn issue(&self, subject: &str, role: Role) -> anyhow::Result<String> {
        self.issue_with_ttl(subject, role, self.ttl)
    }

    pub fn issue_with_ttl(&self, subject: &str, role: Role, ttl: Duration) -> anyhow::Result<String> {
        self.issue_at(subject, role, OffsetDateTime::now_utc(), ttl)
    }

    fn issue_at(
        &self,
        subject: &str,
        role: Role,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let ttl_secs = ttl.as_secs().min(MAX_TTL_MINUTES as u64 * 60) as i64;
        let exp = now + TimeDuration::seconds(ttl_secs);
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(subject, %role, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Checks signature, then expiry, then issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let raw = decode::<RawClaims>(token, &self.decoding, &validation)?.claims;
        let missing = |name: &str| TokenRejection::MissingClaim(name.to_string());
        let claims = Claims {
            sub: raw.sub.filter(|s| !s.is_empty()).ok_or_else(|| missing("sub"))?,
            role: raw.role.ok_or_else(|| missing("role"))?,
            iat: raw.iat.ok_or_else(|| missing("iat"))?,
            exp: raw.exp.ok_or_else(|| missing("exp"))?,
            iss: raw.iss.ok_or_else(|| missing("iss"))?,
            aud: raw.aud.ok_or_else(|| missing("aud"))?,
        };
        debug!(subject = %claims.sub, role = %claims.role, "jwt verified");
        Ok(claims)
    }
}
