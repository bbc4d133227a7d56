use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};

use masjedi_academy::{UserChanges, UserDraft, validate_password};
use masjedi_core::{CircleId, MosqueId, PageRequest, UserId, UserRole};
use masjedi_infra::UserFilter;
use masjedi_infra::prelude::*;

use crate::app::dto::{self, ChangePasswordRequest, CreateUserRequest, PageParams, RoleParams, UpdateUserRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::common::{created, no_content, ok, parse_id, stored};
use crate::app::services::{self, AppServices};
use crate::authz::{self, ADMIN, STAFF};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user))
        .route("/current", get(current_user))
        .route("/change-password", put(change_password))
        .route("/username/:username", get(user_by_username))
        .route("/role/:role", get(users_by_role))
        .route("/circle/:circle_id/students", get(students_of_circle))
        .route("/circle/:circle_id/teacher", get(teacher_of_circle))
        .route("/mosque/:mosque_id", get(users_by_mosque))
        .route("/mosque/:mosque_id/role/:role", get(users_by_mosque_and_role))
        .route("/mosque/:mosque_id/available-teachers", get(available_teachers))
        .route("/mosque/:mosque_id/unassigned-students", get(unassigned_students))
        .route("/student/:student_id/circle/:circle_id", put(transfer_student))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

/// `?role=` wins over the body's role; one of them is required.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(params): QueryParams<RoleParams>,
    JsonBody(body): JsonBody<CreateUserRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let Some(raw_role) = params.role.or(body.role) else {
        return Err(errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "role is required"));
    };
    let role = dto::parse_role(&raw_role)?;
    let draft = dto::validated(UserDraft::new(
        body.username,
        body.password,
        role,
        body.circle_id,
        body.mosque_id,
    ))?;
    let hash = services::hash_password(draft.password().to_string()).await?;
    let user = stored(services.store().create_user(&draft.into_new_user(hash)).await)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user created");
    Ok(created(user))
}

pub async fn current_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    Ok(ok(services.local_user(&principal).await?))
}

async fn require_admin_or_self(
    services: &AppServices,
    principal: &PrincipalContext,
    id: UserId,
) -> Result<(), axum::response::Response> {
    if principal.is_admin() {
        return Ok(());
    }
    let me = services.local_user(principal).await?;
    authz::ensure(me.id == id, "only an admin or the user themselves may access this user")
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: UserId = parse_id(&id)?;
    require_admin_or_self(&services, &principal, id).await?;
    Ok(ok(stored(services.store().get_user(id).await)?))
}

pub async fn user_by_username(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(username): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    match stored(services.store().find_user_by_username(&username).await)? {
        Some(user) => Ok(ok(user)),
        None => Err(errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found")),
    }
}

pub async fn users_by_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(role): Path<String>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let role = dto::parse_role(&role)?;
    Ok(ok(stored(services.store().list_users(UserFilter::Role(role), page.request()).await)?))
}

pub async fn students_of_circle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(circle_id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let circle_id: CircleId = parse_id(&circle_id)?;
    stored(services.store().get_circle(circle_id).await)?;
    let students = stored(
        services
            .store()
            .list_users(UserFilter::StudentsInCircle(circle_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(students.into_content()))
}

pub async fn teacher_of_circle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(circle_id): Path<String>,
) -> ApiResult {
    let circle_id: CircleId = parse_id(&circle_id)?;
    let circle = stored(services.store().get_circle(circle_id).await)?;
    let Some(teacher_id) = circle.teacher_id else {
        return Err(errors::json_error(StatusCode::NOT_FOUND, "not_found", "circle has no teacher"));
    };
    Ok(ok(stored(services.store().get_user(teacher_id).await)?))
}

async fn mosque_users(services: &AppServices, mosque_id: &str, filter: fn(MosqueId) -> UserFilter) -> ApiResult {
    let mosque_id: MosqueId = parse_id(mosque_id)?;
    stored(services.store().get_mosque(mosque_id).await)?;
    let users = stored(
        services
            .store()
            .list_users(filter(mosque_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(users.into_content()))
}

pub async fn users_by_mosque(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(mosque_id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    mosque_users(&services, &mosque_id, UserFilter::Mosque).await
}

pub async fn available_teachers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(mosque_id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    mosque_users(&services, &mosque_id, UserFilter::AvailableTeachers).await
}

pub async fn unassigned_students(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(mosque_id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    mosque_users(&services, &mosque_id, UserFilter::UnassignedStudents).await
}

pub async fn users_by_mosque_and_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((mosque_id, role)): Path<(String, String)>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let mosque_id: MosqueId = parse_id(&mosque_id)?;
    let role = dto::parse_role(&role)?;
    stored(services.store().get_mosque(mosque_id).await)?;
    let users = stored(
        services
            .store()
            .list_users(UserFilter::MosqueAndRole(mosque_id, role), page.request())
            .await,
    )?;
    Ok(ok(users))
}

/// Username is immutable; role, circle and mosque are admin-only changes.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateUserRequest>,
) -> ApiResult {
    let id: UserId = parse_id(&id)?;
    require_admin_or_self(&services, &principal, id).await?;
    let current = stored(services.store().get_user(id).await)?;

    if let Some(username) = &body.username {
        if username.trim() != current.username {
            return Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "username cannot be changed",
            ));
        }
    }

    let role = match &body.role {
        Some(raw) => dto::parse_role(raw)?,
        None => current.role,
    };
    let circle_id = body.circle_id.or(current.circle_id);
    let mosque_id = body.mosque_id.or(current.mosque_id);
    if !principal.is_admin() {
        authz::ensure(role == current.role, "only an admin may change a user's role")?;
        authz::ensure(
            circle_id == current.circle_id && mosque_id == current.mosque_id,
            "only an admin may change a user's circle or mosque",
        )?;
    }

    let password_hash = match body.password {
        Some(password) => {
            dto::validated(validate_password(&password))?;
            Some(services::hash_password(password).await?)
        }
        None => None,
    };

    let changes = UserChanges { password_hash, role, circle_id, mosque_id };
    Ok(ok(stored(services.store().update_user(id, &changes).await)?))
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> ApiResult {
    let me = services.local_user(&principal).await?;
    dto::validated(validate_password(&body.new_password))?;

    let hash = stored(services.store().password_hash(me.id).await)?;
    if !services::verify_password(body.current_password, hash).await? {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "current password is incorrect",
        ));
    }

    let new_hash = services::hash_password(body.new_password).await?;
    stored(services.store().set_password_hash(me.id, &new_hash).await)?;
    tracing::info!(user_id = %me.id, "password changed");
    Ok(no_content())
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: UserId = parse_id(&id)?;
    stored(services.store().delete_user(id).await)?;
    tracing::info!(user_id = %id, "user deleted");
    Ok(no_content())
}

pub async fn transfer_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, circle_id)): Path<(String, String)>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let student_id: UserId = parse_id(&student_id)?;
    let circle_id: CircleId = parse_id(&circle_id)?;
    let student = stored(services.store().get_user(student_id).await)?;
    if student.role != UserRole::Student {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "only students can be transferred between circles",
        ));
    }
    stored(services.store().set_user_circle(student_id, Some(circle_id)).await)?;
    tracing::info!(student_id = %student_id, circle_id = %circle_id, "student transferred");
    Ok(no_content())
}
