use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Router,
};

use masjedi_core::{CircleId, CourseId, LogbookId, PageRequest, UserId};
use masjedi_infra::LogbookFilter;
use masjedi_infra::prelude::*;

use crate::app::dto::{self, DateParams, DateRangeParams, LogbookRequest, PageParams};
use crate::app::errors::ApiResult;
use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::common::{created, no_content, ok, parse_id, require_staff_or_self, stored, visible_record};
use crate::app::services::AppServices;
use crate::authz::{self, STAFF};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_entry))
        .route("/student/:student_id/date", get(entries_by_student_and_day))
        .route("/student/:student_id/course/:course_id", get(entries_by_student_and_course))
        .route("/student/:student_id/course/:course_id/date", get(entries_by_student_course_and_day))
        .route("/student/:student_id/course/:course_id/date-range", get(entries_in_range))
        .route("/circle/:circle_id/course/:course_id/date", get(entries_by_circle_course_and_day))
        .route("/:id", get(get_entry).put(update_entry).delete(delete_entry))
}

pub async fn create_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<LogbookRequest>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let draft = dto::validated(body.into_draft())?;
    let entry = stored(services.store().create_logbook(&draft).await)?;
    Ok(created(entry))
}

pub async fn get_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: LogbookId = parse_id(&id)?;
    let record = services.store().get_logbook(id).await;
    let entry = visible_record(&services, &principal, record, "logbook entry", |r| r.student_id).await?;
    Ok(ok(entry))
}

/// Unpaged listing for a student the caller may see.
async fn list_for_student(
    services: &AppServices,
    principal: &PrincipalContext,
    student_id: UserId,
    filter: LogbookFilter,
) -> ApiResult {
    require_staff_or_self(services, principal, student_id).await?;
    let entries = stored(services.store().list_logbook(filter, PageRequest::unpaged()).await)?;
    Ok(ok(entries.into_content()))
}

pub async fn entries_by_student_course_and_day(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
    QueryParams(params): QueryParams<DateParams>,
) -> ApiResult {
    let student: UserId = parse_id(&student_id)?;
    let course: CourseId = parse_id(&course_id)?;
    let filter = LogbookFilter::StudentCourseDay { student, course, day: params.date };
    list_for_student(&services, &principal, student, filter).await
}

pub async fn entries_by_student_and_day(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(student_id): Path<String>,
    QueryParams(params): QueryParams<DateParams>,
) -> ApiResult {
    let student: UserId = parse_id(&student_id)?;
    let filter = LogbookFilter::StudentDay { student, day: params.date };
    list_for_student(&services, &principal, student, filter).await
}

pub async fn entries_in_range(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
    QueryParams(params): QueryParams<DateRangeParams>,
) -> ApiResult {
    let student: UserId = parse_id(&student_id)?;
    let course: CourseId = parse_id(&course_id)?;
    let range = dto::validated(params.range())?;
    let filter = LogbookFilter::StudentCourseRange { student, course, range };
    list_for_student(&services, &principal, student, filter).await
}

pub async fn entries_by_student_and_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let student: UserId = parse_id(&student_id)?;
    let course: CourseId = parse_id(&course_id)?;
    require_staff_or_self(&services, &principal, student).await?;
    let entries = stored(
        services
            .store()
            .list_logbook(LogbookFilter::StudentCourse { student, course }, page.request())
            .await,
    )?;
    Ok(ok(entries))
}

pub async fn entries_by_circle_course_and_day(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((circle_id, course_id)): Path<(String, String)>,
    QueryParams(params): QueryParams<DateParams>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let circle: CircleId = parse_id(&circle_id)?;
    let course: CourseId = parse_id(&course_id)?;
    stored(services.store().get_circle(circle).await)?;
    let filter = LogbookFilter::CircleCourseDay { circle, course, day: params.date };
    let entries = stored(services.store().list_logbook(filter, PageRequest::unpaged()).await)?;
    Ok(ok(entries.into_content()))
}

pub async fn update_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<LogbookRequest>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let id: LogbookId = parse_id(&id)?;
    let draft = dto::validated(body.into_draft())?;
    Ok(ok(stored(services.store().update_logbook(id, &draft).await)?))
}

pub async fn delete_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let id: LogbookId = parse_id(&id)?;
    stored(services.store().delete_logbook(id).await)?;
    Ok(no_content())
}
