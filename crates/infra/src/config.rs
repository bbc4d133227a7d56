//! Process configuration, read from the environment.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Key material for bearer-token verification.
#[derive(Clone, PartialEq, Eq)]
pub enum JwtKey {
    /// HS256 shared secret.
    Secret(String),
    /// RS256 public key in PEM form.
    RsaPem(String),
}

impl core::fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            JwtKey::Secret(_) => f.write_str("Secret(<redacted>)"),
            JwtKey::RsaPem(_) => f.write_str("RsaPem(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtConfig {
    pub key: JwtKey,
    pub issuer: Option<String>,
    /// True when no key was configured and the dev secret is in use.
    pub insecure_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                message: e.to_string(),
            })?;

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DATABASE_MAX_CONNECTIONS",
                        message: format!("expected a positive integer, got '{raw}'"),
                    });
                }
            },
        };
        let database = get("DATABASE_URL").map(|url| DatabaseConfig { url, max_connections });

        let issuer = get("JWT_ISSUER");
        let jwt = match (get("JWT_PUBLIC_KEY_PEM"), get("JWT_SECRET")) {
            (Some(pem), _) => JwtConfig {
                // Single-line env values carry the PEM line breaks as literal `\n`.
                key: JwtKey::RsaPem(pem.replace("\\n", "\n")),
                issuer,
                insecure_default: false,
            },
            (None, Some(secret)) => JwtConfig {
                key: JwtKey::Secret(secret),
                issuer,
                insecure_default: false,
            },
            (None, None) => JwtConfig {
                key: JwtKey::Secret(DEV_JWT_SECRET.to_string()),
                issuer,
                insecure_default: true,
            },
        };

        Ok(Self {
            bind_addr,
            database,
            jwt,
        })
    }
}
