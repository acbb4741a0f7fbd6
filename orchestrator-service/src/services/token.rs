//! Bearer-token issuing and validation.
//!
//! Tokens are HS256 JWTs carrying the user, the organization they are scoped
//! to, and the role held at login time. Expiry is checked against an injected
//! clock so the boundary is testable: a token is expired at or after the
//! exact expiry instant, never before.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::error::AuthError;

use crate::directory::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Organization the token is scoped to.
    pub org: String,
    /// Role at issue time; the current membership still wins at request time.
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// The identity a validated token asserts.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub organization_id: String,
    pub role: Role,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl TokenService {
    pub fn new(secret: &Secret<String>, expiry_days: i64) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            expiry: Duration::days(expiry_days),
        }
    }

    pub fn issue_token(
        &self,
        user_id: &str,
        organization_id: &str,
        role: Role,
    ) -> Result<String, AuthError> {
        self.issue_token_at(user_id, organization_id, role, Utc::now().timestamp())
    }

    /// Issue a token with an explicit issue instant.
    pub fn issue_token_at(
        &self,
        user_id: &str,
        organization_id: &str,
        role: Role,
        issued_at: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            org: organization_id.to_string(),
            role: role.as_str().to_string(),
            iat: issued_at,
            exp: issued_at + self.expiry.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| AuthError::Malformed)
    }

    pub fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        self.validate_token_at(token, Utc::now().timestamp())
    }

    /// Validate a token against an explicit `now`.
    ///
    /// Expiry is enforced here rather than by the decoder: no leeway, and
    /// `now == exp` is already expired.
    pub fn validate_token_at(&self, token: &str, now: i64) -> Result<Principal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::InvalidSignature => AuthError::Invalid,
                _ => AuthError::Malformed,
            }
        })?;

        if now >= data.claims.exp {
            return Err(AuthError::Expired);
        }

        let role: Role = data.claims.role.parse().map_err(|_| AuthError::Malformed)?;

        Ok(Principal {
            user_id: data.claims.sub,
            organization_id: data.claims.org,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

    fn service() -> TokenService {
        TokenService::new(&Secret::new("test-secret".to_string()), 7)
    }

    #[test]
    fn roundtrip_preserves_identity() {
        let svc = service();
        let token = svc.issue_token("user-1", "org-1", Role::Manager).unwrap();
        let principal = svc.validate_token(&token).unwrap();

        assert_eq!(principal.user_id, "user-1");
        assert_eq!(principal.organization_id, "org-1");
        assert_eq!(principal.role, Role::Manager);
    }

    #[test]
    fn valid_until_the_last_second() {
        let svc = service();
        let issued = 1_700_000_000;
        let token = svc
            .issue_token_at("user-1", "org-1", Role::Member, issued)
            .unwrap();

        assert!(svc.validate_token_at(&token, issued + WEEK_SECS - 1).is_ok());
    }

    #[test]
    fn expired_at_exactly_seven_days() {
        let svc = service();
        let issued = 1_700_000_000;
        let token = svc
            .issue_token_at("user-1", "org-1", Role::Member, issued)
            .unwrap();

        assert!(matches!(
            svc.validate_token_at(&token, issued + WEEK_SECS),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn wrong_secret_is_invalid_not_malformed() {
        let token = service().issue_token("user-1", "org-1", Role::Member).unwrap();
        let other = TokenService::new(&Secret::new("other-secret".to_string()), 7);

        assert!(matches!(
            other.validate_token(&token),
            Err(AuthError::Invalid)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            service().validate_token("not-a-jwt"),
            Err(AuthError::Malformed)
        ));
    }
}
