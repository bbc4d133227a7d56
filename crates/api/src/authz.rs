//! API-side role guards.
//!
//! Every handler calls one of these first; domain and store layers stay
//! auth-agnostic.

use axum::response::Response;

use masjedi_auth::{AuthzError, require_any_role};
use masjedi_core::UserRole;

use crate::app::errors;
use crate::context::PrincipalContext;

pub const ADMIN: &[UserRole] = &[UserRole::Admin];
pub const STAFF: &[UserRole] = &[UserRole::Admin, UserRole::Teacher];
pub const TEACHER: &[UserRole] = &[UserRole::Teacher];
pub const STUDENT: &[UserRole] = &[UserRole::Student];

/// Check the caller holds at least one of `allowed`.
pub fn require_roles(principal: &PrincipalContext, allowed: &[UserRole]) -> Result<(), Response> {
    require_any_role(principal.principal(), allowed).map_err(|e| {
        tracing::debug!(subject = principal.subject(), error = %e, "role check failed");
        errors::authz_error_to_response(e)
    })
}

/// Fail with 403 unless `allowed` holds.
pub fn ensure(allowed: bool, message: &str) -> Result<(), Response> {
    if allowed {
        Ok(())
    } else {
        Err(errors::authz_error_to_response(AuthzError::forbidden(message)))
    }
}
