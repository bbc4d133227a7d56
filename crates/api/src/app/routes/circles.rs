use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{delete, get, post, put},
    Router,
};

use masjedi_core::{CircleId, CourseId, MosqueId, PageRequest, UserId};
use masjedi_infra::CircleFilter;
use masjedi_infra::prelude::*;

use crate::app::dto::{self, CircleRequest, PageParams};
use crate::app::errors::ApiResult;
use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::common::{created, no_content, ok, parse_id, stored};
use crate::app::services::AppServices;
use crate::authz::{self, ADMIN, STAFF};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_circle))
        .route("/with-students", get(circles_with_students))
        .route("/mosque/:mosque_id", get(circles_by_mosque))
        .route("/teacher/:teacher_id", get(circles_by_teacher))
        .route("/without-teacher/mosque/:mosque_id", get(circles_without_teacher))
        .route("/:id", get(get_circle).put(update_circle).delete(delete_circle))
        .route("/:id/students/count", get(count_students))
        .route("/:id/assign-teacher/:teacher_id", put(assign_teacher))
        .route("/:id/remove-teacher", put(remove_teacher))
        .route("/:id/add-course/:course_id", post(add_course))
        .route("/:id/remove-course/:course_id", delete(remove_course))
}

pub async fn create_circle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<CircleRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let draft = dto::validated(body.into_draft())?;
    let circle = stored(services.store().create_circle(&draft).await)?;
    tracing::info!(circle_id = %circle.id, mosque_id = %circle.mosque_id, "circle created");
    Ok(created(circle))
}

pub async fn get_circle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CircleId = parse_id(&id)?;
    Ok(ok(stored(services.store().get_circle(id).await)?))
}

pub async fn circles_by_mosque(
    Extension(services): Extension<Arc<AppServices>>,
    Path(mosque_id): Path<String>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let mosque_id: MosqueId = parse_id(&mosque_id)?;
    stored(services.store().get_mosque(mosque_id).await)?;
    let circles = stored(
        services
            .store()
            .list_circles(CircleFilter::Mosque(mosque_id), page.request())
            .await,
    )?;
    Ok(ok(circles))
}

pub async fn circles_by_teacher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(teacher_id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let teacher_id: UserId = parse_id(&teacher_id)?;
    stored(services.store().get_user(teacher_id).await)?;
    let circles = stored(
        services
            .store()
            .list_circles(CircleFilter::Teacher(teacher_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(circles.into_content()))
}

pub async fn circles_with_students(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let circles = stored(
        services
            .store()
            .list_circles(CircleFilter::WithStudents, page.request())
            .await,
    )?;
    Ok(ok(circles))
}

pub async fn circles_without_teacher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(mosque_id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let mosque_id: MosqueId = parse_id(&mosque_id)?;
    stored(services.store().get_mosque(mosque_id).await)?;
    let circles = stored(
        services
            .store()
            .list_circles(CircleFilter::WithoutTeacherInMosque(mosque_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(circles.into_content()))
}

pub async fn count_students(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CircleId = parse_id(&id)?;
    let circle = stored(services.store().get_circle(id).await)?;
    Ok(ok(circle.number_of_students))
}

pub async fn update_circle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<CircleRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CircleId = parse_id(&id)?;
    let draft = dto::validated(body.into_draft())?;
    Ok(ok(stored(services.store().update_circle(id, &draft).await)?))
}

pub async fn assign_teacher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, teacher_id)): Path<(String, String)>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CircleId = parse_id(&id)?;
    let teacher_id: UserId = parse_id(&teacher_id)?;
    stored(services.store().set_circle_teacher(id, Some(teacher_id)).await)?;
    tracing::info!(circle_id = %id, teacher_id = %teacher_id, "teacher assigned");
    Ok(no_content())
}

pub async fn remove_teacher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CircleId = parse_id(&id)?;
    stored(services.store().set_circle_teacher(id, None).await)?;
    Ok(no_content())
}

pub async fn delete_circle(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CircleId = parse_id(&id)?;
    stored(services.store().delete_circle(id).await)?;
    tracing::info!(circle_id = %id, "circle deleted");
    Ok(no_content())
}

pub async fn add_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, course_id)): Path<(String, String)>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CircleId = parse_id(&id)?;
    let course_id: CourseId = parse_id(&course_id)?;
    stored(services.store().link_course(id, course_id).await)?;
    Ok(no_content())
}

pub async fn remove_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, course_id)): Path<(String, String)>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CircleId = parse_id(&id)?;
    let course_id: CourseId = parse_id(&course_id)?;
    stored(services.store().unlink_course(id, course_id).await)?;
    Ok(no_content())
}
