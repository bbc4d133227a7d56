//! `masjedi-auth` — authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer hands in a bearer token and
//! gets back claims, a [`Principal`], and role decisions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, require_any_role};
pub use claims::{JwtClaims, RealmAccess, TokenValidationError, validate_claims};
pub use jwt::{HmacJwtValidator, JwtError, JwtValidator, RsaJwtValidator};
pub use password::{PasswordError, hash_password, verify_password};
pub use principal::Principal;
pub use roles::Role;
