// src/services/agenda_service.rs

use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AgendaStore,
    models::agenda::{AgendaItem, AgendaPatch, Cidade, Etiqueta, Tecnico, TIMES},
};

// Segunda a sábado
const WEEK_DAYS: i64 = 6;

/// Dados de um agendamento novo, já validados no handler.
#[derive(Debug, Clone)]
pub struct NewAgendaItem {
    pub cliente: String,
    pub telefone: Option<String>,
    pub cidade: Cidade,
    pub tecnico: Tecnico,
    pub etiqueta: Option<Etiqueta>,
    pub obs: Option<String>,
    pub dia: NaiveDate,
    pub horario: String,
    pub manutencao: bool,
}

#[derive(Clone)]
pub struct AgendaService {
    store: Arc<dyn AgendaStore>,
}

impl AgendaService {
    pub fn new(store: Arc<dyn AgendaStore>) -> Self {
        Self { store }
    }

    /// Agendamentos dos seis dias a partir de `week_start`, por dia e horário.
    pub async fn week(&self, week_start: NaiveDate) -> Result<Vec<AgendaItem>, AppError> {
        let end = week_start + Duration::days(WEEK_DAYS);
        let mut items = self.store.list_between(week_start, end).await?;
        items.sort_by(|a, b| a.dia.cmp(&b.dia).then_with(|| a.horario.cmp(&b.horario)));
        Ok(items)
    }

    pub fn suggest_etiqueta(&self, cidade: Cidade) -> Option<Etiqueta> {
        Etiqueta::suggest_for(cidade)
    }

    pub async fn create(&self, new: NewAgendaItem) -> Result<AgendaItem, AppError> {
        check_time_slot(&new.horario)?;

        // Sem etiqueta: usa a regional da cidade, senão "Aprovado"
        let etiqueta = new
            .etiqueta
            .or_else(|| Etiqueta::suggest_for(new.cidade))
            .unwrap_or(Etiqueta::Aprovado);

        let item = AgendaItem {
            id: Uuid::new_v4(),
            cliente: new.cliente.trim().to_string(),
            telefone: new.telefone,
            cidade: new.cidade,
            tecnico: new.tecnico,
            etiqueta,
            obs: new.obs,
            dia: new.dia,
            horario: new.horario,
            manutencao: new.manutencao,
        };

        let created = self.store.insert_item(&item).await?;
        tracing::info!("Agendamento {} criado para {}", created.id, created.dia);
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, patch: AgendaPatch) -> Result<AgendaItem, AppError> {
        if let Some(horario) = &patch.horario {
            check_time_slot(horario)?;
        }

        let mut item = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Agendamento {}", id)))?;

        patch.apply_to(&mut item);
        self.store.update_item(&item).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let removed = self.store.delete_item(id).await?;
        if removed {
            tracing::info!("Agendamento {} removido", id);
        }
        Ok(removed)
    }
}

fn check_time_slot(horario: &str) -> Result<(), AppError> {
    if TIMES.contains(&horario) {
        Ok(())
    } else {
        Err(AppError::InvalidTimeSlot(horario.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryAgendaStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn visit(dia: NaiveDate, horario: &str, cidade: Cidade) -> NewAgendaItem {
        NewAgendaItem {
            cliente: "Maria Souza".into(),
            telefone: None,
            cidade,
            tecnico: Tecnico::Jorge,
            etiqueta: None,
            obs: None,
            dia,
            horario: horario.into(),
            manutencao: false,
        }
    }

    fn service() -> AgendaService {
        AgendaService::new(Arc::new(MemoryAgendaStore::default()))
    }

    #[tokio::test]
    async fn week_covers_monday_to_saturday_in_order() {
        let agenda = service();
        // 2025-03-10 é segunda-feira
        let monday = date(2025, 3, 10);
        agenda.create(visit(date(2025, 3, 15), "08:30", Cidade::Tejuco)).await.unwrap();
        agenda.create(visit(monday, "15:30", Cidade::Tejuco)).await.unwrap();
        agenda.create(visit(monday, "08:30", Cidade::Tejuco)).await.unwrap();
        agenda.create(visit(date(2025, 3, 16), "08:30", Cidade::Tejuco)).await.unwrap();
        agenda.create(visit(date(2025, 3, 9), "08:30", Cidade::Tejuco)).await.unwrap();

        let week = agenda.week(monday).await.unwrap();
        let slots: Vec<(NaiveDate, &str)> = week.iter().map(|i| (i.dia, i.horario.as_str())).collect();
        assert_eq!(
            slots,
            vec![
                (monday, "08:30"),
                (monday, "15:30"),
                (date(2025, 3, 15), "08:30"),
            ]
        );
    }

    #[tokio::test]
    async fn missing_tag_uses_city_suggestion_then_default() {
        let agenda = service();
        let day = date(2025, 3, 11);

        let rural = agenda.create(visit(day, "10:30", Cidade::ZonaRural)).await.unwrap();
        assert_eq!(rural.etiqueta, Etiqueta::ZonaRural);

        let patrocinio = agenda.create(visit(day, "10:30", Cidade::Patrocinio)).await.unwrap();
        assert_eq!(patrocinio.etiqueta, Etiqueta::Aprovado);

        let mut explicit = visit(day, "13:30", Cidade::Tejuco);
        explicit.etiqueta = Some(Etiqueta::Reanalise);
        assert_eq!(agenda.create(explicit).await.unwrap().etiqueta, Etiqueta::Reanalise);
    }

    #[tokio::test]
    async fn rejects_unknown_time_slot() {
        let agenda = service();
        let err = agenda
            .create(visit(date(2025, 3, 11), "09:00", Cidade::Tejuco))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTimeSlot(ref h) if h == "09:00"));
    }

    #[tokio::test]
    async fn update_and_delete() {
        let agenda = service();
        let item = agenda.create(visit(date(2025, 3, 11), "08:30", Cidade::Tejuco)).await.unwrap();

        let patch = AgendaPatch {
            horario: Some("13:30".into()),
            manutencao: Some(true),
            ..Default::default()
        };
        let updated = agenda.update(item.id, patch).await.unwrap();
        assert_eq!(updated.horario, "13:30");
        assert!(updated.manutencao);
        assert_eq!(updated.cliente, item.cliente);

        let missing = agenda.update(Uuid::new_v4(), AgendaPatch::default()).await;
        assert!(matches!(missing, Err(AppError::ResourceNotFound(_))));

        assert!(agenda.delete(item.id).await.unwrap());
        assert!(!agenda.delete(item.id).await.unwrap());
    }
}
