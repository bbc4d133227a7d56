//! Infrastructure wiring shared by all handlers.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;

use masjedi_academy::UserReadModel;
use masjedi_auth::{HmacJwtValidator, JwtError, JwtValidator, RsaJwtValidator};
use masjedi_core::UserRole;
use masjedi_infra::{
    AppConfig, InMemoryAcademyStore, JwtConfig, JwtKey, PostgresAcademyStore, SharedStore,
};
use masjedi_infra::prelude::*;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AppServices {
    store: SharedStore,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Services over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryAcademyStore::new()))
    }

    pub fn store(&self) -> &dyn AcademyStore {
        self.store.as_ref()
    }

    /// Resolve the caller's local user from the token's `preferred_username`.
    pub async fn local_user(&self, principal: &PrincipalContext) -> Result<UserReadModel, Response> {
        let Some(username) = principal.username() else {
            return Err(errors::unauthorized("token carries no username"));
        };
        match self.store.find_user_by_username(username).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                tracing::debug!(username, "no local user for principal");
                Err(errors::unauthorized("no local user for the authenticated principal"))
            }
            Err(e) => Err(errors::store_error_to_response(e)),
        }
    }

    /// Resolve the caller's local user and require it to hold `role`.
    pub async fn local_user_with_role(
        &self,
        principal: &PrincipalContext,
        role: UserRole,
    ) -> Result<UserReadModel, Response> {
        let user = self.local_user(principal).await?;
        if user.role != role {
            return Err(errors::json_error(
                StatusCode::FORBIDDEN,
                "forbidden",
                format!("local user is not a {role}"),
            ));
        }
        Ok(user)
    }
}

/// Pick the store from configuration: Postgres when `DATABASE_URL` is set.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let Some(db) = &config.database else {
        tracing::info!("DATABASE_URL not set; using in-memory store");
        return Ok(AppServices::in_memory());
    };

    let store = PostgresAcademyStore::connect(&db.url, db.max_connections).await?;
    store.migrate().await?;
    tracing::info!(max_connections = db.max_connections, "connected to postgres");
    Ok(AppServices::new(Arc::new(store)))
}

pub fn build_jwt_validator(config: &JwtConfig) -> Result<Arc<dyn JwtValidator>, JwtError> {
    let issuer = config.issuer.as_deref();
    let validator: Arc<dyn JwtValidator> = match &config.key {
        JwtKey::Secret(secret) => Arc::new(HmacJwtValidator::new(secret.as_bytes(), issuer)),
        JwtKey::RsaPem(pem) => Arc::new(RsaJwtValidator::from_pem(pem, issuer)?),
    };
    Ok(validator)
}

/// Runs bcrypt on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, Response> {
    tokio::task::spawn_blocking(move || masjedi_auth::hash_password(&password))
        .await
        .map_err(join_error)?
        .map_err(errors::password_error_to_response)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, Response> {
    tokio::task::spawn_blocking(move || masjedi_auth::verify_password(&password, &hash))
        .await
        .map_err(join_error)?
        .map_err(errors::password_error_to_response)
}

fn join_error(err: tokio::task::JoinError) -> Response {
    tracing::error!(error = %err, "blocking task failed");
    errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}
