use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::get,
    Router,
};

use masjedi_core::{CircleId, CourseId, PageRequest, UserId};
use masjedi_infra::CourseFilter;
use masjedi_infra::prelude::*;

use crate::app::dto::{self, CourseRequest, PageParams, TitleParams};
use crate::app::errors::ApiResult;
use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::common::{created, no_content, ok, parse_id, require_staff_or_self, stored};
use crate::app::services::AppServices;
use crate::authz::{self, ADMIN};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/search", get(search_courses))
        .route("/circle/:circle_id", get(courses_by_circle))
        .route("/student/:student_id", get(courses_by_student))
        .route("/:id", get(get_course).put(update_course).delete(delete_course))
}

pub async fn create_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<CourseRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let draft = dto::validated(body.into_draft())?;
    let course = stored(services.store().create_course(&draft).await)?;
    tracing::info!(course_id = %course.id, "course created");
    Ok(created(course))
}

pub async fn get_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CourseId = parse_id(&id)?;
    Ok(ok(stored(services.store().get_course(id).await)?))
}

pub async fn list_courses(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    Ok(ok(stored(services.store().list_courses(&CourseFilter::All, page.request()).await)?))
}

pub async fn search_courses(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(params): QueryParams<TitleParams>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let filter = CourseFilter::TitleContains(params.title);
    Ok(ok(stored(services.store().list_courses(&filter, page.request()).await)?))
}

pub async fn courses_by_circle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(circle_id): Path<String>,
) -> ApiResult {
    let circle_id: CircleId = parse_id(&circle_id)?;
    stored(services.store().get_circle(circle_id).await)?;
    let courses = stored(
        services
            .store()
            .list_courses(&CourseFilter::Circle(circle_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(courses.into_content()))
}

pub async fn courses_by_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(student_id): Path<String>,
) -> ApiResult {
    let student_id: UserId = parse_id(&student_id)?;
    require_staff_or_self(&services, &principal, student_id).await?;
    stored(services.store().get_user(student_id).await)?;
    let courses = stored(
        services
            .store()
            .list_courses(&CourseFilter::Student(student_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(courses.into_content()))
}

pub async fn update_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<CourseRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CourseId = parse_id(&id)?;
    let draft = dto::validated(body.into_draft())?;
    Ok(ok(stored(services.store().update_course(id, &draft).await)?))
}

pub async fn delete_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: CourseId = parse_id(&id)?;
    stored(services.store().delete_course(id).await)?;
    tracing::info!(course_id = %id, "course deleted");
    Ok(no_content())
}
