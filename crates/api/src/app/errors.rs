use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use masjedi_auth::{AuthzError, PasswordError};
use masjedi_core::DomainError;
use masjedi_infra::StoreError;

/// Handler result: both arms are complete HTTP responses.
pub type ApiResult = Result<Response, Response>;

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(entity) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found")),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::InvalidReference(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        StoreError::Backend { operation, message } => {
            tracing::warn!(operation, error = %message, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(entity) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found")),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
    }
}

pub fn authz_error_to_response(err: AuthzError) -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn password_error_to_response(err: PasswordError) -> Response {
    tracing::error!(error = %err, "password hashing failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "password hashing failed")
}

pub fn unauthorized(message: impl Into<String>) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_documented_statuses() {
        assert_eq!(store_error_to_response(StoreError::NotFound("mosque")).status(), StatusCode::NOT_FOUND);
        assert_eq!(store_error_to_response(StoreError::Conflict("dup".into())).status(), StatusCode::CONFLICT);
        assert_eq!(
            store_error_to_response(StoreError::InvalidReference("not a teacher".into())).status(),
            StatusCode::BAD_REQUEST
        );
        let backend = StoreError::Backend { operation: "get_mosque", message: "io".into() };
        assert_eq!(store_error_to_response(backend).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn domain_errors_map_to_documented_statuses() {
        assert_eq!(
            domain_error_to_response(DomainError::validation("blank")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            domain_error_to_response(DomainError::invalid_id("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            domain_error_to_response(DomainError::unauthorized("no user")).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
