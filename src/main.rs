//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::{
    config::{AppState, Settings},
    docs::ApiDoc,
    middleware::auth::auth_guard,
    models::application::ApplicationFilter,
    services::board_service::spawn_overdue_monitor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG controla o nível, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let pool = settings.connect().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app_state = AppState::from_pool(&settings, pool)?;

    // Carga inicial do quadro; o monitor de SLA trabalha sobre esse cache
    match app_state.board_service.load(&ApplicationFilter::default()).await {
        Ok(apps) => tracing::info!("📋 {} fichas carregadas no quadro", apps.len()),
        Err(e) => tracing::warn!("Carga inicial do quadro falhou: {}", e),
    }
    spawn_overdue_monitor(app_state.board_service.clone(), settings.overdue_refresh);

    let app = app_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", settings.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("Erro no servidor Axum")?;

    Ok(())
}

pub fn app_router(app_state: AppState) -> Router {
    // Quadro de fichas
    let application_routes = Router::new()
        .route(
            "/",
            get(handlers::applications::get_board).post(handlers::applications::create_application),
        )
        .route(
            "/{id}",
            get(handlers::applications::get_application)
                .patch(handlers::applications::update_application)
                .delete(handlers::applications::delete_application),
        )
        .route("/{id}/ingressar", post(handlers::applications::ingressar))
        .route("/{id}/approve", post(handlers::applications::approve))
        .route("/{id}/deny", post(handlers::applications::deny))
        .route("/{id}/reanalysis", post(handlers::applications::send_to_reanalysis))
        .route("/{id}/return", post(handlers::applications::return_to_received))
        .route("/{id}/finalize", post(handlers::applications::finalize))
        .route("/{id}/move", post(handlers::applications::move_application));

    // Agenda dos técnicos
    let agenda_routes = Router::new()
        .route(
            "/",
            get(handlers::agenda::get_week).post(handlers::agenda::create_item),
        )
        .route("/suggest", get(handlers::agenda::suggest_etiqueta))
        .route(
            "/{id}",
            patch(handlers::agenda::update_item).delete(handlers::agenda::delete_item),
        );

    // Tudo abaixo exige o Bearer do backend hospedado
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .nest("/applications", application_routes)
        .nest("/agenda", agenda_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::memory::{MemoryAgendaStore, MemoryApplicationStore, MemoryProfileStore},
        models::{
            application::{Application, Column},
            auth::{Profile, UserRole},
        },
        services::{
            agenda_service::AgendaService,
            auth::{tests::{token_for, SECRET}, AuthService},
            board_service::BoardService,
            sla::BusinessCalendar,
        },
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct Fixture {
        app: Router,
        premium: Profile,
        comercial: Profile,
        received: Uuid,
        in_analysis: Uuid,
    }

    fn record(column: Column, company_id: Uuid) -> Application {
        let now = Utc::now() - Duration::minutes(5);
        Application {
            id: Uuid::new_v4(),
            customer_name: "Maria Souza".into(),
            customer_cpf: None,
            phone: None,
            received_at: now,
            deadline: now + Duration::hours(48),
            created_at: now,
            updated_at: now,
            last_moved_at: now,
            assigned_analyst: None,
            reanalyst: None,
            decision_note: String::new(),
            column,
            labels: vec![],
            company_id: Some(company_id),
        }
    }

    fn fixture() -> Fixture {
        let company = Uuid::new_v4();
        let premium = Profile {
            id: Uuid::new_v4(),
            full_name: Some("Ana".into()),
            role: UserRole::AnalistaPremium,
            company_id: None,
        };
        let comercial = Profile {
            id: Uuid::new_v4(),
            full_name: Some("Caio".into()),
            role: UserRole::Comercial,
            company_id: Some(company),
        };
        let received = record(Column::Received, company);
        let in_analysis = record(Column::UnderAnalysis, company);
        let (received_id, in_analysis_id) = (received.id, in_analysis.id);

        let board = Arc::new(BoardService::new(
            Arc::new(MemoryApplicationStore::with(vec![received, in_analysis])),
            BusinessCalendar::utc(),
        ));
        let agenda = AgendaService::new(Arc::new(MemoryAgendaStore::default()));
        let auth = AuthService::new(
            Arc::new(MemoryProfileStore::with(vec![premium.clone(), comercial.clone()])),
            SECRET.into(),
            None,
        );

        Fixture {
            app: app_router(AppState::new(board, agenda, auth)),
            premium,
            comercial,
            received: received_id,
            in_analysis: in_analysis_id,
        }
    }

    fn post(uri: String, who: &Profile, body: Value) -> Request<Body> {
        send("POST", uri, who, body)
    }

    fn send(method: &str, uri: String, who: &Profile, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token_for(who.id)))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let f = fixture();
        let response = f
            .app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let f = fixture();
        let response = f
            .app
            .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn comercial_cannot_approve() {
        let f = fixture();
        let response = f
            .app
            .oneshot(post(
                format!("/api/applications/{}/approve", f.in_analysis),
                &f.comercial,
                json!({ "note": "Tudo certo" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn approve_without_note_is_bad_request() {
        let f = fixture();
        let response = f
            .app
            .oneshot(post(
                format!("/api/applications/{}/approve", f.in_analysis),
                &f.premium,
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Parecer do analista é obrigatório.");
    }

    #[tokio::test]
    async fn ingressar_moves_card_to_analysis() {
        let f = fixture();
        let response = f
            .app
            .clone()
            .oneshot(post(
                format!("/api/applications/{}/ingressar", f.received),
                &f.premium,
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["application"]["column"], "em_analise");
        assert_eq!(body["application"]["assignedAnalyst"], json!(f.premium.id));

        let response = f
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/applications")
                    .header("authorization", format!("Bearer {}", token_for(f.premium.id)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let board = json_body(response).await;
        assert_eq!(board["columns"][0]["cards"].as_array().unwrap().len(), 0);
        assert_eq!(board["columns"][1]["cards"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn ingressar_with_unknown_analyst_is_not_found() {
        let f = fixture();
        let response = f
            .app
            .clone()
            .oneshot(post(
                format!("/api/applications/{}/ingressar", f.received),
                &f.premium,
                json!({ "analyst": Uuid::new_v4() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = f
            .app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/applications/{}", f.received))
                    .header("authorization", format!("Bearer {}", token_for(f.premium.id)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let card = json_body(response).await;
        assert_eq!(card["column"], "recebido");
        assert_eq!(card["assignedAnalyst"], Value::Null);
    }

    #[tokio::test]
    async fn edit_requires_note_and_keeps_column() {
        let f = fixture();
        let uri = format!("/api/applications/{}", f.in_analysis);

        let response = f
            .app
            .clone()
            .oneshot(send(
                "PATCH",
                uri.clone(),
                &f.premium,
                json!({ "customerName": "Maria Souza", "decisionNote": "  " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = f
            .app
            .oneshot(send(
                "PATCH",
                uri,
                &f.premium,
                json!({
                    "customerName": "Maria S. Souza",
                    "phone": "34 99999-0000",
                    "assignedAnalyst": f.premium.id,
                    "decisionNote": "Aguardando comprovante"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["column"], "em_analise");
        assert_eq!(body["customerName"], "Maria S. Souza");
        assert_eq!(body["decisionNote"], "Aguardando comprovante");
    }

    #[tokio::test]
    async fn comercial_creates_application() {
        let f = fixture();
        let response = f
            .app
            .oneshot(post(
                "/api/applications".into(),
                &f.comercial,
                json!({ "customerName": "Carlos Lima", "customerCpf": "123.456.789-01" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["column"], "recebido");
        assert_eq!(body["customerCpf"], "12345678901");
    }
}
