use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Router,
};

use masjedi_core::{CourseId, ProgressId, UserId};
use masjedi_infra::prelude::*;

use crate::app::dto::ProgressRequest;
use crate::app::errors::ApiResult;
use crate::app::extract::JsonBody;
use crate::app::routes::common::{created, no_content, ok, parse_id, require_staff_or_self, stored, visible_record};
use crate::app::services::AppServices;
use crate::authz::{self, STAFF};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_progress))
        .route("/student/:student_id/course/:course_id", get(progress_by_student_and_course))
        .route("/student/:student_id/course/:course_id/completed", get(completed_by_student_and_course))
        .route("/student/:student_id/course/:course_id/completed/count", get(count_completed))
        .route("/:id", get(get_progress).put(update_progress).delete(delete_progress))
}

pub async fn create_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<ProgressRequest>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let draft = body.into_draft();
    let progress = stored(services.store().create_progress(&draft).await)?;
    Ok(created(progress))
}

pub async fn get_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProgressId = parse_id(&id)?;
    let record = services.store().get_progress(id).await;
    let progress = visible_record(&services, &principal, record, "progress", |r| r.student_id).await?;
    Ok(ok(progress))
}

async fn student_course_progress(
    services: &AppServices,
    principal: &PrincipalContext,
    student_id: &str,
    course_id: &str,
    completed_only: bool,
) -> ApiResult {
    let student_id: UserId = parse_id(student_id)?;
    let course_id: CourseId = parse_id(course_id)?;
    require_staff_or_self(services, principal, student_id).await?;
    let records = stored(
        services
            .store()
            .list_progress(student_id, course_id, completed_only)
            .await,
    )?;
    Ok(ok(records))
}

pub async fn progress_by_student_and_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
) -> ApiResult {
    student_course_progress(&services, &principal, &student_id, &course_id, false).await
}

pub async fn completed_by_student_and_course(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
) -> ApiResult {
    student_course_progress(&services, &principal, &student_id, &course_id, true).await
}

pub async fn count_completed(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((student_id, course_id)): Path<(String, String)>,
) -> ApiResult {
    let student_id: UserId = parse_id(&student_id)?;
    let course_id: CourseId = parse_id(&course_id)?;
    require_staff_or_self(&services, &principal, student_id).await?;
    Ok(ok(stored(services.store().count_completed(student_id, course_id).await)?))
}

pub async fn update_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ProgressRequest>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let id: ProgressId = parse_id(&id)?;
    let draft = body.into_draft();
    Ok(ok(stored(services.store().update_progress(id, &draft).await)?))
}

pub async fn delete_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let id: ProgressId = parse_id(&id)?;
    stored(services.store().delete_progress(id).await)?;
    Ok(no_content())
}
