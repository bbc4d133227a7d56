use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::get,
    Router,
};

use masjedi_core::MosqueId;
use masjedi_infra::MosqueFilter;
use masjedi_infra::prelude::*;

use crate::app::dto::{self, LocationParams, MosqueRequest, PageParams, TitleParams};
use crate::app::errors::ApiResult;
use crate::app::extract::{JsonBody, QueryParams};
use crate::app::routes::common::{created, no_content, ok, parse_id, stored};
use crate::app::services::AppServices;
use crate::authz::{self, ADMIN};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_mosques).post(create_mosque))
        .route("/search/title", get(search_by_title))
        .route("/search/location", get(search_by_location))
        .route("/:id", get(get_mosque).put(update_mosque).delete(delete_mosque))
        .route("/:id/circles/count", get(count_circles))
}

pub async fn create_mosque(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<MosqueRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let draft = dto::validated(body.into_draft())?;
    let mosque = stored(services.store().create_mosque(&draft).await)?;
    tracing::info!(mosque_id = %mosque.id, "mosque created");
    Ok(created(mosque))
}

pub async fn get_mosque(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: MosqueId = parse_id(&id)?;
    Ok(ok(stored(services.store().get_mosque(id).await)?))
}

pub async fn list_mosques(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let mosques = stored(services.store().list_mosques(&MosqueFilter::All, page.request()).await)?;
    Ok(ok(mosques))
}

pub async fn search_by_title(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(params): QueryParams<TitleParams>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let filter = MosqueFilter::TitleContains(params.title);
    Ok(ok(stored(services.store().list_mosques(&filter, page.request()).await)?))
}

pub async fn search_by_location(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(params): QueryParams<LocationParams>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult {
    let filter = MosqueFilter::LocationContains(params.location);
    Ok(ok(stored(services.store().list_mosques(&filter, page.request()).await)?))
}

pub async fn count_circles(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: MosqueId = parse_id(&id)?;
    let mosque = stored(services.store().get_mosque(id).await)?;
    Ok(ok(mosque.number_of_circles))
}

pub async fn update_mosque(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<MosqueRequest>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: MosqueId = parse_id(&id)?;
    let draft = dto::validated(body.into_draft())?;
    Ok(ok(stored(services.store().update_mosque(id, &draft).await)?))
}

pub async fn delete_mosque(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    authz::require_roles(&principal, ADMIN)?;
    let id: MosqueId = parse_id(&id)?;
    stored(services.store().delete_mosque(id).await)?;
    tracing::info!(mosque_id = %id, "mosque deleted");
    Ok(no_content())
}
