// src/models/application.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

// Etiquetas controladas pelo fluxo do quadro
pub const LABEL_IN_ANALYSIS: &str = "Em Análise";
pub const LABEL_APPROVED: &str = "Aprovado";
pub const LABEL_DENIED: &str = "Negado";

// --- Enums ---

/// As seis colunas do quadro. Os ids serializados são os mesmos do frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "kanban_column")]
pub enum Column {
    #[serde(rename = "recebido")]
    #[sqlx(rename = "recebido")]
    Received,
    #[serde(rename = "em_analise")]
    #[sqlx(rename = "em_analise")]
    UnderAnalysis,
    #[serde(rename = "reanalise")]
    #[sqlx(rename = "reanalise")]
    Reanalysis,
    #[serde(rename = "aprovado")]
    #[sqlx(rename = "aprovado")]
    Approved,
    #[serde(rename = "negado_taxa")]
    #[sqlx(rename = "negado_taxa")]
    DeniedWithFee,
    #[serde(rename = "finalizado")]
    #[sqlx(rename = "finalizado")]
    Finalized,
}

impl Column {
    /// Ordem de exibição no quadro.
    pub const ALL: [Column; 6] = [
        Column::Received,
        Column::UnderAnalysis,
        Column::Reanalysis,
        Column::Approved,
        Column::DeniedWithFee,
        Column::Finalized,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Column::Received => "recebido",
            Column::UnderAnalysis => "em_analise",
            Column::Reanalysis => "reanalise",
            Column::Approved => "aprovado",
            Column::DeniedWithFee => "negado_taxa",
            Column::Finalized => "finalizado",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Column::Received => "Recebido",
            Column::UnderAnalysis => "Em Análise",
            Column::Reanalysis => "Reanálise",
            Column::Approved => "Aprovado",
            Column::DeniedWithFee => "Negado com taxa",
            Column::Finalized => "Finalizado",
        }
    }

    /// Orçamento de horas úteis da etapa. `None` = nunca atrasa.
    pub fn sla_hours(self) -> Option<i64> {
        match self {
            Column::Received | Column::UnderAnalysis => Some(24),
            Column::Reanalysis => Some(48),
            _ => None,
        }
    }

    pub fn is_decision(self) -> bool {
        matches!(self, Column::Approved | Column::DeniedWithFee)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// --- Ficha ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "João Silva")]
    pub customer_name: String,
    #[schema(example = "12345678901")]
    pub customer_cpf: Option<String>,
    #[schema(example = "34999990000")]
    pub phone: Option<String>,
    pub received_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_moved_at: DateTime<Utc>,
    pub assigned_analyst: Option<Uuid>,
    pub reanalyst: Option<Uuid>,
    // Parecer do analista; vazio = nenhuma decisão registrada
    #[schema(example = "Documentos conferidos.")]
    pub decision_note: String,
    // "column" é palavra reservada no SQL
    #[sqlx(rename = "board_column")]
    pub column: Column,
    #[schema(example = json!(["Em Análise"]))]
    pub labels: Vec<String>,
    pub company_id: Option<Uuid>,
}

impl Application {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Adiciona mantendo a ordem de inserção e sem duplicar.
    pub fn add_label(&mut self, label: &str) {
        if !self.has_label(label) {
            self.labels.push(label.to_string());
        }
    }

    pub fn remove_label(&mut self, label: &str) {
        self.labels.retain(|l| l != label);
    }

    pub fn has_decision_note(&self) -> bool {
        !self.decision_note.trim().is_empty()
    }
}

/// Dados já validados para inserir uma ficha nova.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub customer_name: String,
    pub customer_cpf: Option<String>,
    pub phone: Option<String>,
    pub deadline: DateTime<Utc>,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Edição dos dados da ficha (nome, telefone, responsável, parecer, datas).
/// Não mexe na coluna nem em `last_moved_at`.
#[derive(Debug, Clone)]
pub struct ApplicationEdit {
    pub customer_name: String,
    pub phone: Option<String>,
    pub assigned_analyst: Option<Uuid>,
    pub decision_note: String,
    /// `None` mantém o valor atual
    pub received_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl ApplicationEdit {
    pub fn apply_to(self, app: &mut Application, now: DateTime<Utc>) {
        app.customer_name = self.customer_name.trim().to_string();
        app.phone = self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        app.assigned_analyst = self.assigned_analyst;
        app.decision_note = self.decision_note.trim().to_string();
        if let Some(received_at) = self.received_at {
            app.received_at = received_at;
        }
        if let Some(deadline) = self.deadline {
            app.deadline = deadline;
        }
        app.updated_at = now;
    }
}

/// Mudança de status a ser repassada ao backend (`applications_change_status`).
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub column: Column,
    pub comment: Option<String>,
}

// --- Filtros ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineFilter {
    #[default]
    Todos,
    Hoje,
    Atrasados,
}

/// Filtro usado tanto na carga em massa quanto na montagem do quadro.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub company_id: Option<Uuid>,
    pub column: Option<Column>,
    pub analyst: Option<Uuid>,
    pub query: Option<String>,
    pub deadline: DeadlineFilter,
}

// --- Visão do quadro ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    #[serde(flatten)]
    pub application: Application,
    pub overdue: bool,
    pub on_fire: bool,
    pub display_labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub column: Column,
    #[schema(example = "Em Análise")]
    pub title: String,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
    pub generated_at: DateTime<Utc>,
}

/// Resultado de uma transição aplicada.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub application: Application,
    // Só é preenchido quando a ficha entra em reanálise
    pub routing: Option<RoutingResult>,
}

/// Resposta do `route_application`. Sem candidato não é erro.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutingResult {
    pub assigned: bool,
    pub reanalyst: Option<Uuid>,
}

impl RoutingResult {
    pub fn from_candidate(reanalyst: Option<Uuid>) -> Self {
        Self { assigned: reanalyst.is_some(), reanalyst }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_ids_match_serialized_form() {
        for column in Column::ALL {
            let json = serde_json::to_value(column).unwrap();
            assert_eq!(json, serde_json::Value::String(column.id().to_string()));
        }
    }

    #[test]
    fn sla_budgets() {
        assert_eq!(Column::Received.sla_hours(), Some(24));
        assert_eq!(Column::UnderAnalysis.sla_hours(), Some(24));
        assert_eq!(Column::Reanalysis.sla_hours(), Some(48));
        assert_eq!(Column::Approved.sla_hours(), None);
        assert_eq!(Column::DeniedWithFee.sla_hours(), None);
        assert_eq!(Column::Finalized.sla_hours(), None);
    }
}
