// src/db/application_repo.rs

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    models::{
        application::{Application, ApplicationFilter, NewApplication, StatusChange},
        auth::Profile,
    },
};

const APPLICATION_FIELDS: &str = r#"
    id, customer_name, customer_cpf, phone,
    received_at, deadline, created_at, updated_at, last_moved_at,
    assigned_analyst, reanalyst, decision_note, board_column, labels, company_id
"#;

/// Colaborador de persistência do quadro (backend hospedado).
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Leitura em massa para popular o quadro.
    async fn load_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, AppError>;

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError>;

    async fn insert_application(&self, new: &NewApplication, actor: &Profile) -> Result<Application, AppError>;

    /// Grava os dados editáveis do cartão (tudo menos a coluna).
    async fn update_card(&self, app: &Application, actor: &Profile) -> Result<(), AppError>;

    /// Grava o cartão e, se houver, aplica a mudança de status com o
    /// comentário de auditoria. Tudo ou nada.
    async fn save_transition(
        &self,
        app: &Application,
        status_change: Option<&StatusChange>,
        actor: &Profile,
    ) -> Result<(), AppError>;

    /// Escolhe um reanalista. `None` = nenhum candidato disponível.
    async fn route_application(&self, id: Uuid, actor: &Profile) -> Result<Option<Uuid>, AppError>;

    async fn delete_application(&self, id: Uuid, reason: &str, actor: &Profile) -> Result<(), AppError>;
}

// O repositório de fichas, responsável por todas as interações com a tabela 'applications'
#[derive(Clone)]
pub struct PgApplicationRepository {
    pool: PgPool,
}

impl PgApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationRepository {
    async fn load_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        qb.push(APPLICATION_FIELDS);
        qb.push(" FROM applications WHERE 1 = 1");

        if let Some(company_id) = filter.company_id {
            qb.push(" AND company_id = ").push_bind(company_id);
        }
        if let Some(column) = filter.column {
            qb.push(" AND board_column = ").push_bind(column);
        }
        if let Some(analyst) = filter.analyst {
            qb.push(" AND assigned_analyst = ").push_bind(analyst);
        }
        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", query);
            qb.push(" AND (customer_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR decision_note ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC");

        let applications = qb
            .build_query_as::<Application>()
            .fetch_all(&self.pool)
            .await?;

        Ok(applications)
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError> {
        let sql = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_FIELDS);
        let app = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(app)
    }

    async fn insert_application(&self, new: &NewApplication, actor: &Profile) -> Result<Application, AppError> {
        // received_at, created_at e last_moved_at nascem juntos
        let sql = format!(
            r#"
            INSERT INTO applications (
                customer_name, customer_cpf, phone,
                received_at, deadline, created_at, updated_at, last_moved_at,
                board_column, labels, decision_note, company_id, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $4, $4, $4, 'recebido', '{{}}', '', $6, $7)
            RETURNING {}
            "#,
            APPLICATION_FIELDS
        );

        let mut tx = begin_scoped(&self.pool, actor.id, actor.company_id).await?;

        let app = sqlx::query_as::<_, Application>(&sql)
            .bind(&new.customer_name)
            .bind(new.customer_cpf.as_deref())
            .bind(new.phone.as_deref())
            .bind(new.created_at)
            .bind(new.deadline)
            .bind(new.company_id)
            .bind(actor.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(app)
    }

    async fn update_card(&self, app: &Application, actor: &Profile) -> Result<(), AppError> {
        let mut tx = begin_scoped(&self.pool, actor.id, actor.company_id).await?;
        write_card(&mut *tx, app).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_transition(
        &self,
        app: &Application,
        status_change: Option<&StatusChange>,
        actor: &Profile,
    ) -> Result<(), AppError> {
        // Sem commit o drop da transação desfaz o cartão junto
        let mut tx = begin_scoped(&self.pool, actor.id, actor.company_id).await?;
        write_card(&mut *tx, app).await?;

        if let Some(change) = status_change {
            sqlx::query("SELECT applications_change_status($1, $2, $3)")
                .bind(app.id)
                .bind(change.column)
                .bind(change.comment.as_deref())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn route_application(&self, id: Uuid, actor: &Profile) -> Result<Option<Uuid>, AppError> {
        let mut tx = begin_scoped(&self.pool, actor.id, actor.company_id).await?;

        let reanalyst = sqlx::query_scalar::<_, Option<Uuid>>("SELECT route_application($1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(reanalyst)
    }

    async fn delete_application(&self, id: Uuid, reason: &str, actor: &Profile) -> Result<(), AppError> {
        let mut tx = begin_scoped(&self.pool, actor.id, actor.company_id).await?;

        // Guarda uma cópia da ficha junto com o motivo antes de apagar
        let audited = sqlx::query(
            r#"
            INSERT INTO application_deletions (application_id, reason, deleted_by, snapshot)
            SELECT a.id, $2, $3, to_jsonb(a)
            FROM applications a
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?;

        if audited.rows_affected() == 0 {
            return Err(AppError::ResourceNotFound(format!("Ficha {}", id)));
        }

        sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

// board_column fica a cargo de applications_change_status
async fn write_card(conn: &mut PgConnection, app: &Application) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE applications
        SET customer_name = $1,
            phone = $2,
            received_at = $3,
            deadline = $4,
            assigned_analyst = $5,
            reanalyst = $6,
            labels = $7,
            decision_note = $8,
            updated_at = $9,
            last_moved_at = $10
        WHERE id = $11
        "#,
    )
    .bind(&app.customer_name)
    .bind(app.phone.as_deref())
    .bind(app.received_at)
    .bind(app.deadline)
    .bind(app.assigned_analyst)
    .bind(app.reanalyst)
    .bind(&app.labels)
    .bind(&app.decision_note)
    .bind(app.updated_at)
    .bind(app.last_moved_at)
    .bind(app.id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ResourceNotFound(format!("Ficha {}", app.id)));
    }
    Ok(())
}
