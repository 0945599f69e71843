// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Permission,
};

/// O trait que define o que é uma permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn permission() -> Permission;
}

/// O extractor (guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store))?;

        let required = T::permission();
        if !user.0.can(required) {
            tracing::debug!("Perfil {} sem a permissão '{}'", user.0.id, required.slug());
            return Err(AppError::PermissionDenied.to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermApplicationsCreate;
impl PermissionDef for PermApplicationsCreate {
    fn permission() -> Permission { Permission::ApplicationsCreate }
}

pub struct PermApplicationsDelete;
impl PermissionDef for PermApplicationsDelete {
    fn permission() -> Permission { Permission::ApplicationsDelete }
}

pub struct PermAgendaWrite;
impl PermissionDef for PermAgendaWrite {
    fn permission() -> Permission { Permission::AgendaWrite }
}
