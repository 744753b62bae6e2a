//! Bearer-token identity.
//!
//! Tokens are HS256 JWTs minted by the identity provider; the `sub` claim
//! carries the numeric user id. Handlers take a `CurrentUser` argument to
//! require authentication.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{ApiError, SharedState};
use crate::errors::AuthError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Mint a token for `user_id` valid for the configured lifetime.
    pub fn issue_token(&self, user_id: i64, roles: Vec<String>) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        let exp = usize::try_from(self.ttl_secs)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(AuthError::LifetimeOverflow {
                ttl_secs: self.ttl_secs,
            })?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp,
            roles,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Issue)
    }

    /// Verify signature and expiry, then resolve the subject to a user.
    pub fn verify(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding, &self.validation).map_err(AuthError::InvalidToken)?;
        let id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidSubject {
                subject: data.claims.sub.clone(),
            })?;
        Ok(CurrentUser {
            id,
            roles: data.claims.roles,
        })
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub roles: Vec<String>,
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let result = bearer_token(&parts.headers).and_then(|token| state.jwt.verify(token));
        result.map_err(|e| {
            warn!(path = %parts.uri.path(), error = %e, "Rejected request credentials");
            ApiError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-that-is-long-enough-0123456789";

    #[test]
    fn test_issue_and_verify_round_trip() {
        let keys = JwtKeys::new(SECRET, 60);
        let token = keys.issue_token(42, vec!["ROLE_USER".into()]).unwrap();
        let user = keys.verify(&token).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.roles, vec!["ROLE_USER"]);
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let keys = JwtKeys::new(SECRET, u64::MAX);
        assert!(matches!(
            keys.issue_token(1, vec![]),
            Err(AuthError::LifetimeOverflow { ttl_secs: u64::MAX })
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtKeys::new(SECRET, 60).issue_token(1, vec![]).unwrap();
        let other = JwtKeys::new("another-secret-entirely-0123456789abcdef", 60);
        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = JwtKeys::new(SECRET, 60);
        let claims = Claims {
            sub: "1".into(),
            iat: 1_000,
            exp: 2_000,
            roles: vec![],
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let keys = JwtKeys::new(SECRET, 60);
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "validator-123".into(),
            iat: now,
            exp: now + 60,
            roles: vec![],
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            keys.verify(&token),
            Err(AuthError::InvalidSubject { .. })
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingToken)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingToken)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingToken)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }
}
