// src/db/memory.rs
//
// Implementações em memória dos colaboradores, usadas nos testes.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AgendaStore, ApplicationStore, ProfileStore},
    models::{
        agenda::AgendaItem,
        application::{Application, ApplicationFilter, Column, NewApplication, StatusChange},
        auth::Profile,
    },
};

#[derive(Default)]
pub struct MemoryApplicationStore {
    rows: Mutex<HashMap<Uuid, Application>>,
    /// Comentários gravados junto com a mudança de status
    pub comments: Mutex<Vec<(Uuid, Column, Option<String>)>>,
    pub deletions: Mutex<Vec<(Uuid, String)>>,
    /// Reanalista devolvido pelo roteamento
    pub reanalyst: Mutex<Option<Uuid>>,
    pub fail_writes: AtomicBool,
    /// Falha só na mudança de status, depois de gravar o cartão
    pub fail_status_change: AtomicBool,
    pub status_calls: AtomicUsize,
}

impl MemoryApplicationStore {
    pub fn with(apps: Vec<Application>) -> Self {
        let store = Self::default();
        {
            let mut rows = store.rows.lock().unwrap();
            for app in apps {
                rows.insert(app.id, app);
            }
        }
        store
    }

    pub fn row(&self, id: Uuid) -> Option<Application> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(anyhow::anyhow!("backend indisponível")));
        }
        Ok(())
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn load_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, AppError> {
        // Mesmo recorte do repositório Postgres (ILIKE em nome e parecer)
        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|a| filter.company_id.is_none() || a.company_id == filter.company_id)
            .filter(|a| filter.column.is_none_or(|c| a.column == c))
            .filter(|a| filter.analyst.is_none() || a.assigned_analyst == filter.analyst)
            .filter(|a| {
                query.as_ref().is_none_or(|q| {
                    a.customer_name.to_lowercase().contains(q.as_str())
                        || a.decision_note.to_lowercase().contains(q.as_str())
                })
            })
            .cloned()
            .collect())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, AppError> {
        Ok(self.row(id))
    }

    async fn insert_application(&self, new: &NewApplication, _actor: &Profile) -> Result<Application, AppError> {
        self.check()?;
        let app = Application {
            id: Uuid::new_v4(),
            customer_name: new.customer_name.clone(),
            customer_cpf: new.customer_cpf.clone(),
            phone: new.phone.clone(),
            received_at: new.created_at,
            deadline: new.deadline,
            created_at: new.created_at,
            updated_at: new.created_at,
            last_moved_at: new.created_at,
            assigned_analyst: None,
            reanalyst: None,
            decision_note: String::new(),
            column: Column::Received,
            labels: vec![],
            company_id: new.company_id,
        };
        self.rows.lock().unwrap().insert(app.id, app.clone());
        Ok(app)
    }

    async fn update_card(&self, app: &Application, _actor: &Profile) -> Result<(), AppError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&app.id)
            .ok_or_else(|| AppError::ResourceNotFound(format!("Ficha {}", app.id)))?;
        let column = row.column;
        *row = app.clone();
        row.column = column;
        Ok(())
    }

    async fn save_transition(
        &self,
        app: &Application,
        status_change: Option<&StatusChange>,
        _actor: &Profile,
    ) -> Result<(), AppError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let current = rows
            .get(&app.id)
            .ok_or_else(|| AppError::ResourceNotFound(format!("Ficha {}", app.id)))?;

        // Monta a linha nova à parte; só substitui se tudo der certo
        let mut staged = app.clone();
        staged.column = current.column;
        if let Some(change) = status_change {
            if self.fail_status_change.load(Ordering::SeqCst) {
                return Err(AppError::CollaboratorFailure("timeout".into()));
            }
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            staged.column = change.column;
            self.comments
                .lock()
                .unwrap()
                .push((app.id, change.column, change.comment.clone()));
        }
        rows.insert(app.id, staged);
        Ok(())
    }

    async fn route_application(&self, id: Uuid, _actor: &Profile) -> Result<Option<Uuid>, AppError> {
        self.check()?;
        let reanalyst = *self.reanalyst.lock().unwrap();
        if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
            if reanalyst.is_some() {
                row.reanalyst = reanalyst;
            }
        }
        Ok(reanalyst)
    }

    async fn delete_application(&self, id: Uuid, reason: &str, _actor: &Profile) -> Result<(), AppError> {
        self.check()?;
        if self.rows.lock().unwrap().remove(&id).is_none() {
            return Err(AppError::ResourceNotFound(format!("Ficha {}", id)));
        }
        self.deletions.lock().unwrap().push((id, reason.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, Profile>>,
}

impl MemoryProfileStore {
    pub fn with(profiles: Vec<Profile>) -> Self {
        let store = Self::default();
        {
            let mut map = store.profiles.lock().unwrap();
            for p in profiles {
                map.insert(p.id, p);
            }
        }
        store
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.profiles.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryAgendaStore {
    items: Mutex<HashMap<Uuid, AgendaItem>>,
}

#[async_trait]
impl AgendaStore for MemoryAgendaStore {
    async fn list_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<AgendaItem>, AppError> {
        // Ordem de HashMap é arbitrária; o serviço ordena
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.dia >= start && i.dia < end)
            .cloned()
            .collect())
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<AgendaItem>, AppError> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn insert_item(&self, item: &AgendaItem) -> Result<AgendaItem, AppError> {
        self.items.lock().unwrap().insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn update_item(&self, item: &AgendaItem) -> Result<AgendaItem, AppError> {
        let mut items = self.items.lock().unwrap();
        match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item.clone())
            }
            None => Err(AppError::ResourceNotFound(format!("Agendamento {}", item.id))),
        }
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.items.lock().unwrap().remove(&id).is_some())
    }
}
