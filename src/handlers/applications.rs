// src/handlers/applications.rs

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermApplicationsCreate, PermApplicationsDelete, RequirePermission},
        tenancy::CompanyScope,
    },
    models::application::{
        Application, ApplicationEdit, ApplicationFilter, BoardView, CardView, Column, DeadlineFilter,
        NewApplication, TransitionOutcome,
    },
    services::kanban_flow::BoardEvent,
};

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

// Prazo padrão de uma ficha nova
const DEFAULT_DEADLINE_HOURS: i64 = 48;

// =============================================================================
//  1. QUADRO
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BoardQuery {
    /// Busca por nome do cliente ou parecer
    pub q: Option<String>,
    pub analyst: Option<Uuid>,
    /// todos | hoje | atrasados
    pub prazo: Option<DeadlineFilter>,
    pub column: Option<Column>,
}

// GET /api/applications
#[utoipa::path(
    get,
    path = "/api/applications",
    tag = "Applications",
    params(
        BoardQuery,
        ("x-company-id" = Option<Uuid>, Header, description = "Empresa (apenas analista premium)")
    ),
    responses(
        (status = 200, description = "Quadro com as seis colunas", body = BoardView)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_board(
    State(app_state): State<AppState>,
    locale: Locale,
    scope: CompanyScope,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ApplicationFilter {
        company_id: scope.0,
        column: query.column,
        analyst: query.analyst,
        query: query.q,
        deadline: query.prazo.unwrap_or_default(),
    };

    let board = app_state
        .board_service
        .board(&filter, Utc::now())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(board))
}

// GET /api/applications/{id}
#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    tag = "Applications",
    params(("id" = Uuid, Path, description = "ID da ficha")),
    responses(
        (status = 200, description = "Ficha com os indicadores do cartão", body = CardView),
        (status = 404, description = "Ficha não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_application(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let app = app_state
        .board_service
        .get(id, &user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let card = app_state.board_service.card_view(app, Utc::now());
    Ok(Json(card))
}

// =============================================================================
//  2. CADASTRO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationPayload {
    #[validate(length(min = 2, message = "too_short"))]
    #[schema(example = "João Silva")]
    pub customer_name: String,

    /// Aceita com ou sem pontuação
    #[schema(example = "123.456.789-01")]
    pub customer_cpf: Option<String>,

    #[validate(length(max = 20, message = "too_long"))]
    #[schema(example = "(34) 99999-0000")]
    pub phone: Option<String>,

    /// Padrão: recebimento + 48h
    pub deadline: Option<DateTime<Utc>>,

    pub company_id: Option<Uuid>,
}

impl CreateApplicationPayload {
    fn into_new(self, user: &AuthenticatedUser, now: DateTime<Utc>) -> Result<NewApplication, AppError> {
        self.validate()?;

        let customer_cpf = match self.customer_cpf.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                if digits.len() != 11 || raw.chars().any(|c| c.is_alphabetic()) {
                    let mut errors = ValidationErrors::new();
                    errors.add("customerCpf", ValidationError::new("cpf"));
                    return Err(AppError::ValidationError(errors));
                }
                Some(digits)
            }
        };

        // Só o premium cadastra para outra empresa
        let company_id = if user.0.sees_all_companies() {
            self.company_id.or(user.0.company_id)
        } else {
            user.0.company_id
        };

        Ok(NewApplication {
            customer_name: self.customer_name.trim().to_string(),
            customer_cpf,
            phone: self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            deadline: self.deadline.unwrap_or(now + Duration::hours(DEFAULT_DEADLINE_HOURS)),
            company_id,
            created_at: now,
        })
    }
}

// POST /api/applications
#[utoipa::path(
    post,
    path = "/api/applications",
    tag = "Applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Ficha criada em Recebido", body = Application),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_application(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _perm: RequirePermission<PermApplicationsCreate>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let new = payload
        .into_new(&user, Utc::now())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let app = app_state
        .board_service
        .create(new, &user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(app)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationPayload {
    #[validate(length(min = 2, message = "too_short"))]
    #[schema(example = "João Silva")]
    pub customer_name: String,

    #[validate(length(max = 20, message = "too_long"))]
    #[schema(example = "(34) 99999-0000")]
    pub phone: Option<String>,

    /// Responsável; ausente deixa a ficha sem analista
    pub assigned_analyst: Option<Uuid>,

    /// Parecer do analista (obrigatório)
    #[validate(length(max = 4000, message = "too_long"))]
    #[schema(example = "Aguardando comprovante de renda.")]
    pub decision_note: String,

    /// Ausente mantém a data atual
    pub received_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl From<UpdateApplicationPayload> for ApplicationEdit {
    fn from(p: UpdateApplicationPayload) -> Self {
        ApplicationEdit {
            customer_name: p.customer_name,
            phone: p.phone,
            assigned_analyst: p.assigned_analyst,
            decision_note: p.decision_note,
            received_at: p.received_at,
            deadline: p.deadline,
        }
    }
}

// O analista informado precisa ter perfil
async fn ensure_analyst_exists(
    app_state: &AppState,
    user: &AuthenticatedUser,
    analyst: Option<Uuid>,
) -> Result<(), AppError> {
    match analyst {
        Some(id) if id != user.0.id => app_state.auth_service.find_profile(id).await.map(|_| ()),
        _ => Ok(()),
    }
}

// PATCH /api/applications/{id}
#[utoipa::path(
    patch,
    path = "/api/applications/{id}",
    tag = "Applications",
    request_body = UpdateApplicationPayload,
    params(("id" = Uuid, Path, description = "ID da ficha")),
    responses(
        (status = 200, description = "Ficha editada, na mesma coluna", body = Application),
        (status = 400, description = "Dados inválidos ou parecer ausente"),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Ficha ou analista não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_application(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateApplicationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    ensure_analyst_exists(&app_state, &user, payload.assigned_analyst)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let app = app_state
        .board_service
        .update_details(id, payload.into(), &user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(app))
}

// =============================================================================
//  3. TRANSIÇÕES
// =============================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressarPayload {
    /// Padrão: o próprio usuário
    pub analyst: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    /// Parecer do analista
    #[validate(length(max = 4000, message = "too_long"))]
    #[schema(example = "Renda comprovada, sem restrições.")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub target: Column,
    #[validate(length(max = 60, message = "too_long"))]
    #[schema(example = "WBR Net")]
    pub label: Option<String>,
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn apply_event(
    app_state: &AppState,
    locale: &Locale,
    user: &AuthenticatedUser,
    headers: &HeaderMap,
    id: Uuid,
    event: BoardEvent,
) -> Result<Json<TransitionOutcome>, ApiError> {
    let key = idempotency_key(headers);
    let outcome = app_state
        .board_service
        .transition(id, event, &user.0, key.as_deref())
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok(Json(outcome))
}

// POST /api/applications/{id}/ingressar
#[utoipa::path(
    post,
    path = "/api/applications/{id}/ingressar",
    tag = "Applications",
    request_body = IngressarPayload,
    params(
        ("id" = Uuid, Path, description = "ID da ficha"),
        ("Idempotency-Key" = Option<String>, Header, description = "Repetições devolvem a primeira resposta")
    ),
    responses(
        (status = 200, description = "Analista atribuído", body = TransitionOutcome),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Ficha ou analista não encontrado"),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn ingressar(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<IngressarPayload>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_analyst_exists(&app_state, &user, payload.analyst)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let analyst = payload.analyst.unwrap_or(user.0.id);
    apply_event(&app_state, &locale, &user, &headers, id, BoardEvent::Ingressar { analyst }).await
}

async fn decide(
    app_state: AppState,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    id: Uuid,
    payload: DecisionPayload,
    build: fn(Option<String>) -> BoardEvent,
) -> Result<Json<TransitionOutcome>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    apply_event(&app_state, &locale, &user, &headers, id, build(payload.note)).await
}

// POST /api/applications/{id}/approve
#[utoipa::path(
    post,
    path = "/api/applications/{id}/approve",
    tag = "Applications",
    request_body = DecisionPayload,
    params(
        ("id" = Uuid, Path, description = "ID da ficha"),
        ("Idempotency-Key" = Option<String>, Header, description = "Repetições devolvem a primeira resposta")
    ),
    responses(
        (status = 200, description = "Ficha aprovada", body = TransitionOutcome),
        (status = 400, description = "Parecer obrigatório"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    decide(app_state, locale, user, headers, id, payload, |note| BoardEvent::Approve { note }).await
}

// POST /api/applications/{id}/deny
#[utoipa::path(
    post,
    path = "/api/applications/{id}/deny",
    tag = "Applications",
    request_body = DecisionPayload,
    params(
        ("id" = Uuid, Path, description = "ID da ficha"),
        ("Idempotency-Key" = Option<String>, Header, description = "Repetições devolvem a primeira resposta")
    ),
    responses(
        (status = 200, description = "Ficha negada com taxa", body = TransitionOutcome),
        (status = 400, description = "Parecer obrigatório"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn deny(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    decide(app_state, locale, user, headers, id, payload, |note| BoardEvent::Deny { note }).await
}

// POST /api/applications/{id}/reanalysis
#[utoipa::path(
    post,
    path = "/api/applications/{id}/reanalysis",
    tag = "Applications",
    request_body = DecisionPayload,
    params(
        ("id" = Uuid, Path, description = "ID da ficha"),
        ("Idempotency-Key" = Option<String>, Header, description = "Repetições devolvem a primeira resposta")
    ),
    responses(
        (status = 200, description = "Ficha em reanálise, com o resultado do roteamento", body = TransitionOutcome),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_to_reanalysis(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    decide(app_state, locale, user, headers, id, payload, |note| {
        BoardEvent::SendToReanalysis { note }
    })
    .await
}

// POST /api/applications/{id}/return
#[utoipa::path(
    post,
    path = "/api/applications/{id}/return",
    tag = "Applications",
    params(
        ("id" = Uuid, Path, description = "ID da ficha"),
        ("Idempotency-Key" = Option<String>, Header, description = "Repetições devolvem a primeira resposta")
    ),
    responses(
        (status = 200, description = "Ficha devolvida para Recebido", body = TransitionOutcome)
    ),
    security(("api_jwt" = []))
)]
pub async fn return_to_received(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    apply_event(&app_state, &locale, &user, &headers, id, BoardEvent::Return).await
}

// POST /api/applications/{id}/finalize
#[utoipa::path(
    post,
    path = "/api/applications/{id}/finalize",
    tag = "Applications",
    params(
        ("id" = Uuid, Path, description = "ID da ficha"),
        ("Idempotency-Key" = Option<String>, Header, description = "Repetições devolvem a primeira resposta")
    ),
    responses(
        (status = 200, description = "Ficha finalizada", body = TransitionOutcome),
        (status = 409, description = "Só fichas aprovadas ou negadas podem ser finalizadas")
    ),
    security(("api_jwt" = []))
)]
pub async fn finalize(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    apply_event(&app_state, &locale, &user, &headers, id, BoardEvent::Finalize).await
}

// POST /api/applications/{id}/move
#[utoipa::path(
    post,
    path = "/api/applications/{id}/move",
    tag = "Applications",
    request_body = MovePayload,
    params(
        ("id" = Uuid, Path, description = "ID da ficha"),
        ("Idempotency-Key" = Option<String>, Header, description = "Repetições devolvem a primeira resposta")
    ),
    responses(
        (status = 200, description = "Ficha movida", body = TransitionOutcome),
        (status = 400, description = "Analista ou parecer ausente"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_application(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let event = BoardEvent::Move { target: payload.target, label: payload.label };
    apply_event(&app_state, &locale, &user, &headers, id, event).await
}

// =============================================================================
//  4. EXCLUSÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteApplicationPayload {
    #[validate(length(min = 1, max = 500, message = "required"))]
    #[schema(example = "Ficha duplicada")]
    pub reason: String,
}

// DELETE /api/applications/{id}
#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    tag = "Applications",
    request_body = DeleteApplicationPayload,
    params(("id" = Uuid, Path, description = "ID da ficha")),
    responses(
        (status = 204, description = "Ficha excluída"),
        (status = 400, description = "Motivo obrigatório"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_application(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _perm: RequirePermission<PermApplicationsDelete>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeleteApplicationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .board_service
        .delete(id, &payload.reason, &user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::{Profile, UserRole};

    fn user(role: UserRole, company_id: Option<Uuid>) -> AuthenticatedUser {
        AuthenticatedUser(Profile { id: Uuid::new_v4(), full_name: None, role, company_id })
    }

    fn payload(cpf: Option<&str>) -> CreateApplicationPayload {
        CreateApplicationPayload {
            customer_name: " João Silva ".into(),
            customer_cpf: cpf.map(str::to_string),
            phone: None,
            deadline: None,
            company_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn intake_normalizes_cpf_and_defaults_deadline() {
        let now = Utc::now();
        let company = Uuid::new_v4();
        let comercial = user(UserRole::Comercial, Some(company));

        let new = payload(Some("123.456.789-01")).into_new(&comercial, now).unwrap();
        assert_eq!(new.customer_name, "João Silva");
        assert_eq!(new.customer_cpf.as_deref(), Some("12345678901"));
        assert_eq!(new.deadline, now + Duration::hours(48));
        // Comercial não escolhe a empresa
        assert_eq!(new.company_id, Some(company));
    }

    #[test]
    fn intake_rejects_short_cpf() {
        let comercial = user(UserRole::Comercial, None);
        let err = payload(Some("1234")).into_new(&comercial, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
