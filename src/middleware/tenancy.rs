// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

// O nome do nosso cabeçalho HTTP customizado
const COMPANY_ID_HEADER: &str = "x-company-id";

/// Empresa cujas fichas a requisição enxerga. `None` = todas (só premium).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompanyScope(pub Option<Uuid>);

impl CompanyScope {
    /// Premium escolhe pelo cabeçalho; os demais ficam presos à própria empresa.
    pub fn resolve(user: &AuthenticatedUser, requested: Option<Uuid>) -> Result<Self, AppError> {
        let profile = &user.0;
        if profile.sees_all_companies() {
            return Ok(CompanyScope(requested));
        }

        match (profile.company_id, requested) {
            (Some(own), None) => Ok(CompanyScope(Some(own))),
            (Some(own), Some(asked)) if own == asked => Ok(CompanyScope(Some(own))),
            _ => Err(AppError::PermissionDenied),
        }
    }
}

impl<S> FromRequestParts<S> for CompanyScope
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);
        let reject = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| reject(AppError::InvalidToken))?;

        // Tenta ler o cabeçalho X-Company-ID (opcional)
        let requested = match parts.headers.get(COMPANY_ID_HEADER) {
            Some(value) => {
                let parsed = value
                    .to_str()
                    .ok()
                    .and_then(|v| Uuid::parse_str(v.trim()).ok())
                    .ok_or_else(|| reject(AppError::InvalidHeader(COMPANY_ID_HEADER)))?;
                Some(parsed)
            }
            None => None,
        };

        CompanyScope::resolve(&user, requested).map_err(reject)
    }
}
