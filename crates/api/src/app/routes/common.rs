//! Helpers shared by the route modules.

use std::str::FromStr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use masjedi_academy::{CircleReadModel, UserReadModel};
use masjedi_core::{CircleId, DomainError, UserId, UserRole};
use masjedi_infra::{StoreError, StoreResult};
use masjedi_infra::prelude::*;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

/// Parse a path segment into a typed id (`400 invalid_id` on failure).
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(errors::domain_error_to_response)
}

/// Unwrap a store result, mapping failures to their HTTP response.
pub fn stored<T>(result: StoreResult<T>) -> Result<T, Response> {
    result.map_err(errors::store_error_to_response)
}

pub fn ok<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

pub fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Staff pass; anyone else must be the local user `subject`.
pub async fn require_staff_or_self(
    services: &AppServices,
    principal: &PrincipalContext,
    subject: UserId,
) -> Result<(), Response> {
    if principal.is_staff() {
        return Ok(());
    }
    let me = services.local_user(principal).await?;
    authz::ensure(me.id == subject, "only staff or the user themselves may access this resource")
}

/// A single record for staff or the student it belongs to. Anyone else gets
/// the same 404 as for a missing record.
pub async fn visible_record<T>(
    services: &AppServices,
    principal: &PrincipalContext,
    record: StoreResult<T>,
    entity: &'static str,
    owner: impl Fn(&T) -> UserId,
) -> Result<T, Response> {
    if principal.is_staff() {
        return stored(record);
    }
    let me = services.local_user(principal).await?;
    match record {
        Ok(found) if owner(&found) == me.id => Ok(found),
        Ok(_) | Err(StoreError::NotFound(_)) => Err(errors::store_error_to_response(StoreError::NotFound(entity))),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

/// A circle the teacher leads (403 otherwise).
pub async fn teacher_circle(
    services: &AppServices,
    teacher: &UserReadModel,
    circle: CircleId,
) -> Result<CircleReadModel, Response> {
    let circle = stored(services.store().get_circle(circle).await)?;
    authz::ensure(circle.is_taught_by(teacher.id), "circle is not taught by the caller")?;
    Ok(circle)
}

/// A student in one of the teacher's circles (403 otherwise).
pub async fn teacher_student(
    services: &AppServices,
    teacher: &UserReadModel,
    student: UserId,
) -> Result<UserReadModel, Response> {
    let student = stored(services.store().get_user(student).await)?;
    let Some(circle) = student.circle_id.filter(|_| student.role == UserRole::Student) else {
        return Err(errors::authz_error_to_response(masjedi_auth::AuthzError::forbidden(
            "student is not in a circle taught by the caller",
        )));
    };
    teacher_circle(services, teacher, circle).await?;
    Ok(student)
}

#[cfg(test)]
mod tests {
    use super::*;
    use masjedi_core::MosqueId;

    #[test]
    fn parse_id_maps_garbage_to_bad_request() {
        assert_eq!(parse_id::<MosqueId>("12").unwrap(), MosqueId::new(12));
        assert_eq!(parse_id::<MosqueId>("abc").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_id::<MosqueId>("0").unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
