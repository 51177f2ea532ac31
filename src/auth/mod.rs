use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;

const SESSION_TTL_HOURS: i64 = 24;
const REMEMBER_ME_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Issues and verifies bearer tokens against a fixed credential table.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    users: HashMap<String, String>,
}

impl AuthService {
    pub fn new(secret: &str, users: Vec<(String, String)>) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                users: users.into_iter().collect(),
            }),
        }
    }

    pub fn check_credentials(&self, username: &str, password: &str) -> Result<(), AppError> {
        match self.inner.users.get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => {
                warn!(user = %username, "Login rejected");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// Signs a token valid for one day, or seven with `remember_me`.
    pub fn issue_token(&self, username: &str, remember_me: bool) -> Result<String, AppError> {
        let ttl = if remember_me {
            Duration::days(REMEMBER_ME_TTL_DAYS)
        } else {
            Duration::hours(SESSION_TTL_HOURS)
        };
        self.issue_token_with_ttl(username, ttl)
    }

    pub fn issue_token_with_ttl(&self, username: &str, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.inner.encoding)
            .map_err(|e| AppError::Unexpected(format!("Failed to sign token: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.inner.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {e}");
                AppError::Unauthorized("Token is invalid or expired".to_string())
            })
    }
}

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Token is missing".to_string()))?;

        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Malformed Authorization header".to_string()))?;

        let claims = AuthService::from_ref(state).verify_token(token)?;
        Ok(AuthUser { username: claims.sub })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new("unit-test-secret", vec![("demo".into(), "demo123".into())])
    }

    #[test]
    fn credentials_are_checked_exactly() {
        let auth = service();
        assert!(auth.check_credentials("demo", "demo123").is_ok());
        assert!(auth.check_credentials("demo", "DEMO123").is_err());
        assert!(auth.check_credentials("ghost", "demo123").is_err());
    }

    #[test]
    fn token_round_trip_carries_username() {
        let auth = service();
        let token = auth.issue_token("demo", false).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "demo");
        assert!(claims.exp - claims.iat <= SESSION_TTL_HOURS * 3600);
    }

    #[test]
    fn remember_me_extends_expiry() {
        let auth = service();
        let token = auth.issue_token("demo", true).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, REMEMBER_ME_TTL_DAYS * 24 * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = service();
        let token = auth.issue_token_with_ttl("demo", Duration::hours(-2)).unwrap();
        assert!(auth.verify_token(&token).unwrap_err().is_unauthorized());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = AuthService::new("other-secret", vec![]);
        let token = other.issue_token("demo", false).unwrap();
        assert!(service().verify_token(&token).is_err());
        assert!(service().verify_token("not.a.jwt").is_err());
    }
}
