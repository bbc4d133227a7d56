//! Student workspace: read-only views of the caller's own records.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;

use masjedi_academy::UserReadModel;
use masjedi_core::{CourseId, PageRequest, UserRole};
use masjedi_infra::{CourseFilter, LogbookFilter};
use masjedi_infra::prelude::*;

use crate::app::dto::{OptionalDateParams, PageParams};
use crate::app::errors::ApiResult;
use crate::app::extract::QueryParams;
use crate::app::routes::common::{ok, parse_id, stored};
use crate::app::services::AppServices;
use crate::authz::{self, STUDENT};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/courses", get(my_courses))
        .route("/progress/:course_id", get(my_progress))
        .route("/progress/:course_id/completed/count", get(my_completed_count))
        .route("/daily-progress/:course_id", get(my_daily_progress))
        .route("/notes", get(my_notes))
}

async fn current_student(services: &AppServices, principal: &PrincipalContext) -> Result<UserReadModel, Response> {
    authz::require_roles(principal, STUDENT)?;
    services.local_user_with_role(principal, UserRole::Student).await
}

pub async fn my_courses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let me = current_student(&services, &principal).await?;
    let courses = stored(
        services
            .store()
            .list_courses(&CourseFilter::Student(me.id), PageRequest::unpaged())
            .await,
    )?;
    Ok(ok(courses.into_content()))
}

pub async fn my_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(course_id): Path<String>,
) -> ApiResult {
    let me = current_student(&services, &principal).await?;
    let course_id: CourseId = parse_id(&course_id)?;
    Ok(ok(stored(services.store().list_progress(me.id, course_id, false).await)?))
}

pub async fn my_completed_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(course_id): Path<String>,
) -> ApiResult {
    let me = current_student(&services, &principal).await?;
    let course_id: CourseId = parse_id(&course_id)?;
    Ok(ok(stored(services.store().count_completed(me.id, course_id).await)?))
}

/// Defaults to today (UTC) when `date` is absent.
pub async fn my_daily_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(course_id): Path<String>,
    QueryParams(params): QueryParams<OptionalDateParams>,
) -> ApiResult {
    let me = current_student(&services, &principal).await?;
    let course: CourseId = parse_id(&course_id)?;
    let day = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let filter = LogbookFilter::StudentCourseDay { student: me.id, course, day };
    let entries = stored(services.store().list_logbook(filter, PageRequest::unpaged()).await)?;
    Ok(ok(entries.into_content()))
}

pub async fn my_notes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let me = current_student(&services, &principal).await?;
    Ok(ok(stored(services.store().list_notes(me.id, page.request()).await)?))
}
