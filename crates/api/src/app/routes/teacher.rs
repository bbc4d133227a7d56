//! Teacher workspace: everything a teacher does for their own circles.
//!
//! The caller must hold the TEACHER role and resolve to a local TEACHER
//! user. A circle is reachable iff the caller teaches it; a student iff the
//! student's circle is reachable.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::{delete, get, post},
    Router,
};

use masjedi_academy::UserReadModel;
use masjedi_core::{CircleId, CourseId, LogbookId, NoteId, PageRequest, UserId, UserRole};
use masjedi_infra::{CircleFilter, CourseFilter, LogbookFilter, UserFilter};
use masjedi_infra::prelude::*;

use crate::app::dto::{self, DateParams, LogbookRequest, NoteRequest, PageParams, ProgressRequest};
use crate::app::errors::ApiResult;
use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::common::{created, no_content, ok, parse_id, stored, teacher_circle, teacher_student};
use crate::app::services::AppServices;
use crate::authz::{self, TEACHER};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/circles", get(my_circles))
        .route("/circles/:circle_id", get(circle_details))
        .route("/circles/:circle_id/students", get(circle_students))
        .route("/students/:student_id/courses", get(student_courses))
        .route("/students/:student_id/courses/:course_id/progress", get(student_progress))
        .route("/students/:student_id/courses/:course_id/daily-progress", get(student_daily_progress))
        .route("/students/:student_id/notes", get(student_notes))
        .route("/progress", post(record_progress))
        .route("/daily-progress", post(add_daily_progress))
        .route("/daily-progress/:id", delete(delete_daily_progress))
        .route("/notes", post(add_note))
        .route("/notes/:id", delete(delete_note))
}

async fn current_teacher(services: &AppServices, principal: &PrincipalContext) -> Result<UserReadModel, Response> {
    authz::require_roles(principal, TEACHER)?;
    services.local_user_with_role(principal, UserRole::Teacher).await
}

pub async fn my_circles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let circles = stored(
        services
            .store()
            .list_circles(CircleFilter::Teacher(me.id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(circles.into_content()))
}

pub async fn circle_details(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(circle_id): Path<String>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let circle_id: CircleId = parse_id(&circle_id)?;
    Ok(ok(teacher_circle(&services, &me, circle_id).await?))
}

pub async fn circle_students(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(circle_id): Path<String>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let circle_id: CircleId = parse_id(&circle_id)?;
    teacher_circle(&services, &me, circle_id).await?;
    let students = stored(
        services
            .store()
            .list_users(UserFilter::StudentsInCircle(circle_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(students.into_content()))
}

pub async fn student_courses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(student_id): Path<String>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let student_id: UserId = parse_id(&student_id)?;
    teacher_student(&services, &me, student_id).await?;
    let courses = stored(
        services
            .store()
            .list_courses(&CourseFilter::Student(student_id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(courses.into_content()))
}

pub async fn student_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let student_id: UserId = parse_id(&student_id)?;
    let course_id: CourseId = parse_id(&course_id)?;
    teacher_student(&services, &me, student_id).await?;
    Ok(ok(stored(services.store().list_progress(student_id, course_id, false).await)?))
}

pub async fn record_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<ProgressRequest>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    teacher_student(&services, &me, body.student_id).await?;
    let progress = stored(services.store().create_progress(&body.into_draft()).await)?;
    tracing::info!(teacher_id = %me.id, progress_id = %progress.id, "progress recorded");
    Ok(created(progress))
}

pub async fn student_daily_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
    QueryParams(params): QueryParams<DateParams>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let student: UserId = parse_id(&student_id)?;
    let course: CourseId = parse_id(&course_id)?;
    teacher_student(&services, &me, student).await?;
    let filter = LogbookFilter::StudentCourseDay { student, course, day: params.date };
    let entries = stored(services.store().list_logbook(filter, PageRequest::unpaged()).await)?;
    Ok(ok(entries.into_content()))
}

pub async fn add_daily_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<LogbookRequest>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    teacher_student(&services, &me, body.student_id).await?;
    let draft = dto::validated(body.into_draft())?;
    Ok(created(stored(services.store().create_logbook(&draft).await)?))
}

pub async fn delete_daily_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let id: LogbookId = parse_id(&id)?;
    let entry = stored(services.store().get_logbook(id).await)?;
    teacher_student(&services, &me, entry.student_id).await?;
    stored(services.store().delete_logbook(id).await)?;
    Ok(no_content())
}

pub async fn student_notes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(student_id): Path<String>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let student_id: UserId = parse_id(&student_id)?;
    teacher_student(&services, &me, student_id).await?;
    Ok(ok(stored(services.store().list_notes(student_id, page.request()).await)?))
}

pub async fn add_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    teacher_student(&services, &me, body.student_id).await?;
    let draft = dto::validated(body.into_draft())?;
    Ok(created(stored(services.store().create_note(&draft, Some(me.id)).await)?))
}

pub async fn delete_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let me = current_teacher(&services, &principal).await?;
    let id: NoteId = parse_id(&id)?;
    let note = stored(services.store().get_note(id).await)?;
    teacher_student(&services, &me, note.student_id).await?;
    stored(services.store().delete_note(id).await)?;
    Ok(no_content())
}
