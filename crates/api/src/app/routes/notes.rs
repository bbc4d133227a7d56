use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::Response,
    routing::{get, post},
    Router,
};

use masjedi_academy::NoteReadModel;
use masjedi_core::{NoteId, UserId, UserRole};
use masjedi_infra::prelude::*;

use crate::app::dto::{self, NoteRequest, PageParams};
use crate::app::errors::ApiResult;
use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::common::{created, no_content, ok, parse_id, require_staff_or_self, stored, visible_record};
use crate::app::services::AppServices;
use crate::authz::{self, STAFF};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_note))
        .route("/student/:student_id", get(notes_by_student))
        .route("/:id", get(get_note).put(update_note).delete(delete_note))
}

pub async fn create_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> ApiResult {
    authz::require_roles(&principal, STAFF)?;
    let draft = dto::validated(body.into_draft())?;
    // Staff without a local user (e.g. an IdP-only admin) write anonymous notes.
    let author = match principal.username() {
        Some(username) => stored(services.store().find_user_by_username(username).await)?.map(|u| u.id),
        None => None,
    };
    let note = stored(services.store().create_note(&draft, author).await)?;
    Ok(created(note))
}

pub async fn get_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: NoteId = parse_id(&id)?;
    let record = services.store().get_note(id).await;
    let note = visible_record(&services, &principal, record, "note", |r| r.student_id).await?;
    Ok(ok(note))
}

pub async fn notes_by_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(student_id): Path<String>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let student_id: UserId = parse_id(&student_id)?;
    require_staff_or_self(&services, &principal, student_id).await?;
    stored(services.store().get_user(student_id).await)?;
    Ok(ok(stored(services.store().list_notes(student_id, page.request()).await)?))
}

/// ADMIN may edit any note; a TEACHER only notes they wrote.
async fn editable_note(
    services: &AppServices,
    principal: &PrincipalContext,
    id: NoteId,
) -> Result<NoteReadModel, Response> {
    authz::require_roles(principal, STAFF)?;
    let note = stored(services.store().get_note(id).await)?;
    if principal.is_admin() {
        return Ok(note);
    }
    let me = services.local_user_with_role(principal, UserRole::Teacher).await?;
    authz::ensure(note.is_authored_by(me.id), "only the authoring teacher may change this note")?;
    Ok(note)
}

pub async fn update_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> ApiResult {
    let id: NoteId = parse_id(&id)?;
    editable_note(&services, &principal, id).await?;
    let draft = dto::validated(body.into_draft())?;
    Ok(ok(stored(services.store().update_note(id, &draft).await)?))
}

pub async fn delete_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: NoteId = parse_id(&id)?;
    editable_note(&services, &principal, id).await?;
    stored(services.store().delete_note(id).await)?;
    Ok(no_content())
}
