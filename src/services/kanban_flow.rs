// src/services/kanban_flow.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        application::{
            Application, Column, StatusChange, LABEL_APPROVED, LABEL_DENIED, LABEL_IN_ANALYSIS,
        },
        auth::{Permission, Profile},
    },
};

/// Ações que movimentam (ou reatribuem) uma ficha no quadro.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// Analista assume a ficha
    Ingressar { analyst: Uuid },
    Approve { note: Option<String> },
    Deny { note: Option<String> },
    SendToReanalysis { note: Option<String> },
    /// Desingressar: devolve para Recebido
    Return,
    Finalize,
    /// Arrastar e soltar genérico
    Move { target: Column, label: Option<String> },
}

impl BoardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::Ingressar { .. } => "ingressar",
            BoardEvent::Approve { .. } => "approve",
            BoardEvent::Deny { .. } => "deny",
            BoardEvent::SendToReanalysis { .. } => "reanalysis",
            BoardEvent::Return => "return",
            BoardEvent::Finalize => "finalize",
            BoardEvent::Move { .. } => "move",
        }
    }
}

/// O que a máquina de estados decidiu, antes de qualquer I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub application: Application,
    pub status_change: Option<StatusChange>,
    /// Entrou em reanálise: pedir um reanalista ao roteamento
    pub needs_routing: bool,
}

pub struct KanbanFlow;

impl KanbanFlow {
    /// Calcula o novo estado da ficha. Nunca altera `current`; em caso de erro
    /// nada é aplicado.
    pub fn plan(
        current: &Application,
        event: BoardEvent,
        actor: &Profile,
        now: DateTime<Utc>,
    ) -> Result<TransitionPlan, AppError> {
        let from = current.column;
        let event_name = event.name();
        let invalid = || AppError::InvalidTransition { from, event: event_name };

        let mut next = current.clone();
        let mut comment = None;
        let mut needs_routing = false;

        let target = match event {
            BoardEvent::Ingressar { analyst } => {
                require(actor, Permission::ApplicationsDecide)?;
                if from == Column::Finalized {
                    return Err(invalid());
                }
                next.assigned_analyst = Some(analyst);
                next.add_label(LABEL_IN_ANALYSIS);
                // Fora de Recebido é só uma reatribuição
                if from == Column::Received { Column::UnderAnalysis } else { from }
            }
            BoardEvent::Approve { note } | BoardEvent::Deny { note } => {
                let approving = event_name == "approve";
                match from {
                    Column::UnderAnalysis => require(actor, Permission::ApplicationsDecide)?,
                    Column::Reanalysis => require(actor, Permission::ReanalysisDecide)?,
                    _ => return Err(invalid()),
                }
                store_note(&mut next, note);
                if !next.has_decision_note() {
                    return Err(AppError::DecisionNoteRequired);
                }
                comment = Some(next.decision_note.clone());
                if approving { Column::Approved } else { Column::DeniedWithFee }
            }
            BoardEvent::SendToReanalysis { note } => {
                require(actor, Permission::ApplicationsDecide)?;
                if !matches!(
                    from,
                    Column::UnderAnalysis | Column::Approved | Column::DeniedWithFee
                ) {
                    return Err(invalid());
                }
                store_note(&mut next, note);
                if next.has_decision_note() {
                    comment = Some(next.decision_note.clone());
                }
                needs_routing = true;
                Column::Reanalysis
            }
            BoardEvent::Return => {
                // Em Recebido só limpa o responsável, sem mudar de coluna
                next.assigned_analyst = None;
                next.remove_label(LABEL_IN_ANALYSIS);
                Column::Received
            }
            BoardEvent::Finalize => {
                require(actor, Permission::ApplicationsDecide)?;
                if !from.is_decision() {
                    return Err(invalid());
                }
                Column::Finalized
            }
            BoardEvent::Move { target, label } => {
                require(actor, Permission::ApplicationsDecide)?;
                if target == from {
                    return Err(invalid());
                }
                if target.is_decision() && !next.has_decision_note() {
                    return Err(AppError::DecisionNoteRequired);
                }
                if let Some(label) = label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) {
                    next.remove_label(LABEL_APPROVED);
                    next.remove_label(LABEL_DENIED);
                    next.add_label(&label);
                }
                needs_routing = target == Column::Reanalysis;
                target
            }
        };

        // Regra central: ninguém sai de Recebido sem analista
        if from == Column::Received && target != Column::Received && next.assigned_analyst.is_none() {
            return Err(AppError::AnalystRequired);
        }

        apply_decision_label(&mut next, target);
        next.updated_at = now;

        let status_change = if target != from {
            next.column = target;
            next.last_moved_at = now;
            Some(StatusChange { column: target, comment })
        } else {
            None
        };

        Ok(TransitionPlan {
            application: next,
            status_change,
            needs_routing,
        })
    }
}

fn require(actor: &Profile, permission: Permission) -> Result<(), AppError> {
    if actor.can(permission) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

fn store_note(app: &mut Application, note: Option<String>) {
    if let Some(note) = note {
        let trimmed = note.trim();
        if !trimmed.is_empty() {
            app.decision_note = trimmed.to_string();
        }
    }
}

// "Aprovado" e "Negado" nunca convivem
fn apply_decision_label(app: &mut Application, target: Column) {
    match target {
        Column::Approved => {
            app.remove_label(LABEL_DENIED);
            app.add_label(LABEL_APPROVED);
        }
        Column::DeniedWithFee => {
            app.remove_label(LABEL_APPROVED);
            app.add_label(LABEL_DENIED);
        }
        _ => {}
    }
}
