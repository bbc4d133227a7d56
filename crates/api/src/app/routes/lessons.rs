use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Router,
};

use masjedi_core::{CourseId, LessonId};
use masjedi_infra::{LessonOrder, StoreError};
use masjedi_infra::prelude::*;

use crate::app::dto::{self, LessonRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::extract::JsonBody;
use crate::app::routes::common::{created, no_content, ok, parse_id, stored};
use crate::app::services::AppServices;
use crate::authz::{self, ADMIN};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_lesson))
        .route("/course/:course_id", get(lessons_by_course))
        .route("/course/:course_id/ordered", get(lessons_by_course_ordered))
        .route("/course/:course_id/max-order", get(max_order))
        .route("/course/:course_id/lesson/:lesson_id/exists", get(lesson_exists_in_course))
        .route("/:id", get(get_lesson).put(update_lesson).delete(delete_lesson))
}

pub async fn create_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<LessonRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let draft = dto::validated(body.into_draft())?;
    let lesson = stored(services.store().create_lesson(&draft).await)?;
    tracing::info!(lesson_id = %lesson.id, course_id = %lesson.course_id, order = lesson.order, "lesson created");
    Ok(created(lesson))
}

pub async fn get_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: LessonId = parse_id(&id)?;
    Ok(ok(stored(services.store().get_lesson(id).await)?))
}

pub async fn lessons_by_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path(course_id): Path<String>,
) -> ApiResult {
    let course_id: CourseId = parse_id(&course_id)?;
    Ok(ok(stored(services.store().list_lessons(course_id, LessonOrder::Id).await)?))
}

pub async fn lessons_by_course_ordered(
    Extension(services): Extension<Arc<AppServices>>,
    Path(course_id): Path<String>,
) -> ApiResult {
    let course_id: CourseId = parse_id(&course_id)?;
    Ok(ok(stored(services.store().list_lessons(course_id, LessonOrder::Position).await)?))
}

/// `null` when the course has no lessons yet.
pub async fn max_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(course_id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let course_id: CourseId = parse_id(&course_id)?;
    Ok(ok(stored(services.store().max_lesson_order(course_id).await)?))
}

pub async fn lesson_exists_in_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path((course_id, lesson_id)): Path<(String, String)>,
) -> ApiResult {
    let course_id: CourseId = parse_id(&course_id)?;
    let lesson_id: LessonId = parse_id(&lesson_id)?;
    let exists = match services.store().get_lesson(lesson_id).await {
        Ok(lesson) => lesson.course_id == course_id,
        Err(StoreError::NotFound(_)) => false,
        Err(e) => return Err(errors::store_error_to_response(e)),
    };
    Ok(ok(exists))
}

pub async fn update_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<LessonRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: LessonId = parse_id(&id)?;
    let draft = dto::validated(body.into_draft())?;
    Ok(ok(stored(services.store().update_lesson(id, &draft).await)?))
}

pub async fn delete_lesson(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: LessonId = parse_id(&id)?;
    stored(services.store().delete_lesson(id).await)?;
    Ok(no_content())
}
