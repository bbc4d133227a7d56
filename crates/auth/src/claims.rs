use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

/// Access-token claims in the identity provider's (Keycloak) shape.
///
/// Only the fields this service reads are modelled; everything else in the
/// token is ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (IdP user id).
    pub sub: String,

    /// Login name; links the token to a local user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    #[serde(default)]
    pub realm_access: RealmAccess,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature checks happen in [`crate::jwt`]; this only looks at `iat`/`exp`.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claims(iat: i64, exp: i64) -> JwtClaims {
        JwtClaims {
            sub: "kc-1".into(),
            preferred_username: Some("admin".into()),
            realm_access: RealmAccess::default(),
            iat,
            exp,
            iss: None,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn accepts_token_inside_window() {
        assert_eq!(validate_claims(&claims(100, 200), at(150)), Ok(()));
    }

    #[test]
    fn rejects_expired_and_future_tokens() {
        assert_eq!(validate_claims(&claims(100, 200), at(200)), Err(TokenValidationError::Expired));
        assert_eq!(validate_claims(&claims(100, 200), at(99)), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn rejects_inverted_window() {
        assert_eq!(
            validate_claims(&claims(200, 200), at(200)),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn decodes_keycloak_payload_and_ignores_extra_fields() {
        let json = serde_json::json!({
            "sub": "f1d2",
            "preferred_username": "teacher1",
            "realm_access": { "roles": ["TEACHER", "offline_access"] },
            "resource_access": { "account": { "roles": ["view-profile"] } },
            "iat": 1, "exp": 2, "azp": "masjedi"
        });
        let claims: JwtClaims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.preferred_username.as_deref(), Some("teacher1"));
        assert_eq!(claims.realm_access.roles.len(), 2);
        assert_eq!(claims.iss, None);
    }
}
