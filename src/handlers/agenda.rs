// src/handlers/agenda.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermAgendaWrite, RequirePermission},
    },
    models::agenda::{AgendaItem, AgendaPatch, Cidade, Etiqueta, Tecnico},
    services::agenda_service::NewAgendaItem,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WeekQuery {
    /// Primeiro dia da semana (segunda-feira)
    #[param(example = "2025-03-10")]
    pub week_start: NaiveDate,
}

// GET /api/agenda
#[utoipa::path(
    get,
    path = "/api/agenda",
    tag = "Agenda",
    params(WeekQuery),
    responses(
        (status = 200, description = "Agendamentos de segunda a sábado", body = [AgendaItem])
    ),
    security(("api_jwt" = []))
)]
pub async fn get_week(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<WeekQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .agenda_service
        .week(query.week_start)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(items))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgendaPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria Souza")]
    pub cliente: String,
    pub telefone: Option<String>,
    pub cidade: Cidade,
    pub tecnico: Tecnico,
    /// Sem etiqueta: sugestão da cidade ou "Aprovado"
    pub etiqueta: Option<Etiqueta>,
    pub obs: Option<String>,
    #[schema(example = "2025-03-10")]
    pub dia: NaiveDate,
    #[schema(example = "08:30")]
    pub horario: String,
    #[serde(default)]
    pub manutencao: bool,
}

// POST /api/agenda
#[utoipa::path(
    post,
    path = "/api/agenda",
    tag = "Agenda",
    request_body = CreateAgendaPayload,
    responses(
        (status = 201, description = "Agendamento criado", body = AgendaItem),
        (status = 400, description = "Horário inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermAgendaWrite>,
    Json(payload): Json<CreateAgendaPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewAgendaItem {
        cliente: payload.cliente,
        telefone: payload.telefone,
        cidade: payload.cidade,
        tecnico: payload.tecnico,
        etiqueta: payload.etiqueta,
        obs: payload.obs,
        dia: payload.dia,
        horario: payload.horario,
        manutencao: payload.manutencao,
    };

    let item = app_state
        .agenda_service
        .create(new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PATCH /api/agenda/{id}
#[utoipa::path(
    patch,
    path = "/api/agenda/{id}",
    tag = "Agenda",
    request_body = AgendaPatch,
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Agendamento atualizado", body = AgendaItem),
        (status = 404, description = "Agendamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermAgendaWrite>,
    Path(id): Path<Uuid>,
    Json(patch): Json<AgendaPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .agenda_service
        .update(id, patch)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub removed: bool,
}

// DELETE /api/agenda/{id}
#[utoipa::path(
    delete,
    path = "/api/agenda/{id}",
    tag = "Agenda",
    params(("id" = Uuid, Path, description = "ID do agendamento")),
    responses(
        (status = 200, description = "Indica se algo foi removido", body = DeleteResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _perm: RequirePermission<PermAgendaWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = app_state
        .agenda_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(DeleteResponse { removed }))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuggestQuery {
    pub cidade: Cidade,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionResponse {
    pub etiqueta: Option<Etiqueta>,
}

// GET /api/agenda/suggest
#[utoipa::path(
    get,
    path = "/api/agenda/suggest",
    tag = "Agenda",
    params(SuggestQuery),
    responses(
        (status = 200, description = "Etiqueta regional sugerida", body = SuggestionResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn suggest_etiqueta(
    State(app_state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Json<SuggestionResponse> {
    Json(SuggestionResponse {
        etiqueta: app_state.agenda_service.suggest_etiqueta(query.cidade),
    })
}
