// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::application::Column;

// Erros de domínio. A mensagem final para o usuário vem do I18nStore.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Parecer do analista é obrigatório")]
    DecisionNoteRequired,

    #[error("A ficha precisa de um analista responsável")]
    AnalystRequired,

    #[error("Transição inválida: {event} a partir de {from}")]
    InvalidTransition { from: Column, event: &'static str },

    #[error("Permissão negada")]
    PermissionDenied,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Perfil não encontrado")]
    ProfileNotFound,

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("O motivo da exclusão é obrigatório")]
    DeleteReasonRequired,

    #[error("Horário inválido: {0}")]
    InvalidTimeSlot(String),

    #[error("Cabeçalho inválido: {0}")]
    InvalidHeader(&'static str),

    // Falha do backend hospedado (procedures, rede)
    #[error("Falha no colaborador de persistência: {0}")]
    CollaboratorFailure(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

// O corpo de erro que sai para o cliente
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    /// Chave usada no catálogo de mensagens.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::DecisionNoteRequired => "decision_note_required",
            AppError::AnalystRequired => "analyst_required",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::PermissionDenied => "permission_denied",
            AppError::InvalidToken => "invalid_token",
            AppError::ProfileNotFound => "profile_not_found",
            AppError::ResourceNotFound(_) => "resource_not_found",
            AppError::DeleteReasonRequired => "delete_reason_required",
            AppError::InvalidTimeSlot(_) => "invalid_time_slot",
            AppError::InvalidHeader(_) => "invalid_header",
            AppError::CollaboratorFailure(_) => "collaborator_failure",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::DecisionNoteRequired
            | AppError::AnalystRequired
            | AppError::DeleteReasonRequired
            | AppError::InvalidTimeSlot(_)
            | AppError::InvalidHeader(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::ProfileNotFound | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::CollaboratorFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        let error = store.translate(&locale.0, self.code());

        let details = match self {
            // Retorna os códigos de cada campo inválido
            AppError::ValidationError(errors) => {
                let mut fields: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let codes = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    fields.insert(field.to_string(), codes);
                }
                Some(json!(fields))
            }
            AppError::InvalidTransition { from, event } => {
                Some(json!({ "from": from, "event": event }))
            }
            AppError::ResourceNotFound(what) => Some(json!({ "resource": what })),
            AppError::InvalidTimeSlot(slot) => Some(json!({ "horario": slot })),
            AppError::InvalidHeader(name) => Some(json!({ "header": name })),
            AppError::CollaboratorFailure(reason) => {
                tracing::warn!("Falha no colaborador: {}", reason);
                None
            }
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {:?}", self);
                None
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}
