// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{PgAgendaRepository, PgApplicationRepository, PgProfileRepository},
    services::{
        agenda_service::AgendaService, auth::AuthService, board_service::BoardService,
        sla::BusinessCalendar,
    },
};

// Horário de Brasília
const DEFAULT_SLA_OFFSET_HOURS: i32 = -3;

/// Configuração lida do ambiente (e do .env, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub sla_offset_hours: i32,
    pub overdue_refresh: Duration,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let jwt_audience = env::var("JWT_AUDIENCE").ok().filter(|v| !v.trim().is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 5u32)?;
        let sla_offset_hours = parse_or("SLA_UTC_OFFSET_HOURS", DEFAULT_SLA_OFFSET_HOURS)?;
        // Zero faria o tokio::time::interval entrar em pânico
        let refresh_secs = parse_or("OVERDUE_REFRESH_SECS", 60u64)?.max(1);

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_audience,
            bind_addr,
            db_max_connections,
            sla_offset_hours,
            overdue_refresh: Duration::from_secs(refresh_secs),
        })
    }

    pub fn calendar(&self) -> anyhow::Result<BusinessCalendar> {
        BusinessCalendar::from_offset_hours(self.sla_offset_hours)
            .with_context(|| format!("SLA_UTC_OFFSET_HOURS fora do intervalo: {}", self.sla_offset_hours))
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválido: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub board_service: Arc<BoardService>,
    pub agenda_service: AgendaService,
    pub auth_service: AuthService,
    pub i18n_store: Arc<I18nStore>,
}

impl AppState {
    pub fn new(
        board_service: Arc<BoardService>,
        agenda_service: AgendaService,
        auth_service: AuthService,
    ) -> Self {
        Self {
            board_service,
            agenda_service,
            auth_service,
            i18n_store: Arc::new(I18nStore::new()),
        }
    }

    /// Monta o gráfico de dependências sobre o Postgres.
    pub fn from_pool(settings: &Settings, pool: PgPool) -> anyhow::Result<Self> {
        let calendar = settings.calendar()?;

        let board_service = Arc::new(BoardService::new(
            Arc::new(PgApplicationRepository::new(pool.clone())),
            calendar,
        ));
        let agenda_service = AgendaService::new(Arc::new(PgAgendaRepository::new(pool.clone())));
        let auth_service = AuthService::new(
            Arc::new(PgProfileRepository::new(pool)),
            settings.jwt_secret.clone(),
            settings.jwt_audience.clone(),
        );

        Ok(Self::new(board_service, agenda_service, auth_service))
    }
}
