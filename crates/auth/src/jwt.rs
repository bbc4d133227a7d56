use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("invalid key: {0}")]
    Key(String),

    #[error("token rejected: {0}")]
    Decode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

fn validation(algorithm: Algorithm, issuer: Option<&str>) -> Validation {
    let mut validation = Validation::new(algorithm);
    // Expiry is checked by `validate_claims` against the caller's clock.
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }
    validation
}

fn decode_and_check(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
    now: DateTime<Utc>,
) -> Result<JwtClaims, JwtError> {
    let data = decode::<JwtClaims>(token, key, validation).map_err(|e| JwtError::Decode(e.to_string()))?;
    validate_claims(&data.claims, now)?;
    Ok(data.claims)
}

/// HS256 with a shared secret.
pub struct HmacJwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl HmacJwtValidator {
    pub fn new(secret: &[u8], issuer: Option<&str>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: validation(Algorithm::HS256, issuer),
        }
    }
}

impl JwtValidator for HmacJwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        decode_and_check(token, &self.key, &self.validation, now)
    }
}

/// RS256 against the identity provider's realm public key.
pub struct RsaJwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl RsaJwtValidator {
    pub fn from_pem(pem: &str, issuer: Option<&str>) -> Result<Self, JwtError> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| JwtError::Key(e.to_string()))?;
        Ok(Self {
            key,
            validation: validation(Algorithm::RS256, issuer),
        })
    }
}

impl JwtValidator for RsaJwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        decode_and_check(token, &self.key, &self.validation, now)
    }
}
