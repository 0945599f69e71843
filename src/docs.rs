// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Users ---
        handlers::auth::get_me,

        // --- Applications ---
        handlers::applications::get_board,
        handlers::applications::get_application,
        handlers::applications::create_application,
        handlers::applications::update_application,
        handlers::applications::ingressar,
        handlers::applications::approve,
        handlers::applications::deny,
        handlers::applications::send_to_reanalysis,
        handlers::applications::return_to_received,
        handlers::applications::finalize,
        handlers::applications::move_application,
        handlers::applications::delete_application,

        // --- Agenda ---
        handlers::agenda::get_week,
        handlers::agenda::create_item,
        handlers::agenda::update_item,
        handlers::agenda::delete_item,
        handlers::agenda::suggest_etiqueta,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::Profile,

            // --- Applications ---
            models::application::Column,
            models::application::Application,
            models::application::DeadlineFilter,
            models::application::CardView,
            models::application::BoardColumn,
            models::application::BoardView,
            models::application::RoutingResult,
            models::application::TransitionOutcome,

            // --- Agenda ---
            models::agenda::Tecnico,
            models::agenda::Cidade,
            models::agenda::Etiqueta,
            models::agenda::AgendaItem,
            models::agenda::AgendaPatch,

            // --- Payloads ---
            handlers::applications::CreateApplicationPayload,
            handlers::applications::UpdateApplicationPayload,
            handlers::applications::IngressarPayload,
            handlers::applications::DecisionPayload,
            handlers::applications::MovePayload,
            handlers::applications::DeleteApplicationPayload,
            handlers::agenda::CreateAgendaPayload,
            handlers::agenda::DeleteResponse,
            handlers::agenda::SuggestionResponse,
        )
    ),
    tags(
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Applications", description = "Quadro de fichas: cadastro, transições e exclusão"),
        (name = "Agenda", description = "Agenda semanal dos técnicos")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
