// src/db/agenda_repo.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::agenda::AgendaItem};

#[async_trait]
pub trait AgendaStore: Send + Sync {
    /// Agendamentos com `start <= dia < end`.
    async fn list_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<AgendaItem>, AppError>;

    async fn get_item(&self, id: Uuid) -> Result<Option<AgendaItem>, AppError>;

    async fn insert_item(&self, item: &AgendaItem) -> Result<AgendaItem, AppError>;

    async fn update_item(&self, item: &AgendaItem) -> Result<AgendaItem, AppError>;

    /// `true` se algo foi removido.
    async fn delete_item(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgAgendaRepository {
    pool: PgPool,
}

impl PgAgendaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgendaStore for PgAgendaRepository {
    async fn list_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<AgendaItem>, AppError> {
        let items = sqlx::query_as::<_, AgendaItem>(
            r#"
            SELECT id, cliente, telefone, cidade, tecnico, etiqueta, obs, dia, horario, manutencao
            FROM agenda_items
            WHERE dia >= $1 AND dia < $2
            ORDER BY dia, horario
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<AgendaItem>, AppError> {
        let item = sqlx::query_as::<_, AgendaItem>(
            r#"
            SELECT id, cliente, telefone, cidade, tecnico, etiqueta, obs, dia, horario, manutencao
            FROM agenda_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn insert_item(&self, item: &AgendaItem) -> Result<AgendaItem, AppError> {
        let created = sqlx::query_as::<_, AgendaItem>(
            r#"
            INSERT INTO agenda_items (id, cliente, telefone, cidade, tecnico, etiqueta, obs, dia, horario, manutencao)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, cliente, telefone, cidade, tecnico, etiqueta, obs, dia, horario, manutencao
            "#,
        )
        .bind(item.id)
        .bind(&item.cliente)
        .bind(item.telefone.as_deref())
        .bind(item.cidade)
        .bind(item.tecnico)
        .bind(item.etiqueta)
        .bind(item.obs.as_deref())
        .bind(item.dia)
        .bind(&item.horario)
        .bind(item.manutencao)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_item(&self, item: &AgendaItem) -> Result<AgendaItem, AppError> {
        let updated = sqlx::query_as::<_, AgendaItem>(
            r#"
            UPDATE agenda_items
            SET cliente = $2, telefone = $3, cidade = $4, tecnico = $5, etiqueta = $6,
                obs = $7, dia = $8, horario = $9, manutencao = $10
            WHERE id = $1
            RETURNING id, cliente, telefone, cidade, tecnico, etiqueta, obs, dia, horario, manutencao
            "#,
        )
        .bind(item.id)
        .bind(&item.cliente)
        .bind(item.telefone.as_deref())
        .bind(item.cidade)
        .bind(item.tecnico)
        .bind(item.etiqueta)
        .bind(item.obs.as_deref())
        .bind(item.dia)
        .bind(&item.horario)
        .bind(item.manutencao)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::ResourceNotFound(format!("Agendamento {}", item.id)))
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM agenda_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
