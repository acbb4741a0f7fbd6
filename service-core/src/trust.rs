//! Service-trust credential for gateway-to-backend calls.
//!
//! The gateway attaches a short-lived HMAC credential to every outbound call,
//! proving the call originates from the trusted gateway. It is distinct from
//! the end user's bearer token: backends verify the credential against the
//! shared gateway secret and read the acting principal from the identity
//! headers so they can enforce their own tenant checks redundantly.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const CREDENTIAL_HEADER: &str = "x-service-credential";
pub const ACTING_USER_HEADER: &str = "x-acting-user-id";
pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const ROLE_HEADER: &str = "x-user-role";

/// Set on backend responses that refused the credential, so the gateway can
/// tell misconfiguration apart from an ordinary backend 401/403.
pub const TRUST_REJECTED_HEADER: &str = "x-trust-rejected";

const CREDENTIAL_VERSION: &str = "v1";

/// Maximum accepted credential age. The credential is request-scoped, so the
/// window only needs to absorb clock skew and queueing.
pub const DEFAULT_MAX_AGE_SECS: i64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential header malformed")]
    Malformed,
    #[error("credential timestamp outside the accepted window")]
    Stale,
    #[error("credential signature mismatch")]
    BadSignature,
}

/// The principal the gateway forwarded alongside a verified credential.
#[derive(Debug, Clone)]
pub struct ForwardedPrincipal {
    pub user_id: String,
    pub organization_id: String,
    pub role: String,
}

/// Mint the credential header value for an outbound call.
pub fn mint_credential(
    secret: &str,
    user_id: &str,
    organization_id: &str,
    role: &str,
    issued_at: i64,
) -> Result<String, anyhow::Error> {
    let mac = sign(secret, user_id, organization_id, role, issued_at)?;
    Ok(format!("{},{},{}", CREDENTIAL_VERSION, issued_at, mac))
}

/// Verify a credential header against the identity headers it covers.
///
/// Comparison is constant-time; the timestamp must fall within `max_age_secs`
/// of `now` in either direction.
pub fn verify_credential(
    secret: &str,
    header_value: &str,
    principal: &ForwardedPrincipal,
    now: i64,
    max_age_secs: i64,
) -> Result<(), CredentialError> {
    let mut parts = header_value.splitn(3, ',');
    let version = parts.next().ok_or(CredentialError::Malformed)?;
    let timestamp: i64 = parts
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or(CredentialError::Malformed)?;
    let presented = parts.next().ok_or(CredentialError::Malformed)?;

    if version != CREDENTIAL_VERSION {
        return Err(CredentialError::Malformed);
    }

    if (now - timestamp).abs() > max_age_secs {
        return Err(CredentialError::Stale);
    }

    let expected = sign(
        secret,
        &principal.user_id,
        &principal.organization_id,
        &principal.role,
        timestamp,
    )
    .map_err(|_| CredentialError::Malformed)?;

    let expected_bytes = expected.as_bytes();
    let presented_bytes = presented.as_bytes();
    if expected_bytes.len() != presented_bytes.len() {
        return Err(CredentialError::BadSignature);
    }

    if expected_bytes.ct_eq(presented_bytes).into() {
        Ok(())
    } else {
        Err(CredentialError::BadSignature)
    }
}

fn sign(
    secret: &str,
    user_id: &str,
    organization_id: &str,
    role: &str,
    issued_at: i64,
) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    let payload = format!("{}|{}|{}|{}", user_id, organization_id, role, issued_at);
    mac.update(payload.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}
