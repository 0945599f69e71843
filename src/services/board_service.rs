// src/services/board_service.rs

use chrono::{DateTime, Utc};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};
use tokio::{sync::RwLock, task::JoinHandle};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ApplicationStore,
    models::{
        application::{
            Application, ApplicationEdit, ApplicationFilter, BoardColumn, BoardView, CardView,
            Column, DeadlineFilter, NewApplication, RoutingResult, TransitionOutcome,
        },
        auth::{Permission, Profile},
    },
    services::{
        kanban_flow::{BoardEvent, KanbanFlow},
        sla::BusinessCalendar,
    },
};

const REPLAY_CAPACITY: usize = 1024;

type ReplayKey = (Uuid, Uuid, String);

// Respostas já entregues por Idempotency-Key (FIFO limitado)
#[derive(Default)]
struct ReplayCache {
    order: VecDeque<ReplayKey>,
    entries: HashMap<ReplayKey, TransitionOutcome>,
}

impl ReplayCache {
    fn get(&self, key: &ReplayKey) -> Option<TransitionOutcome> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: ReplayKey, outcome: TransitionOutcome) {
        if self.entries.insert(key.clone(), outcome).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > REPLAY_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

#[derive(Default)]
struct BoardState {
    applications: HashMap<Uuid, Application>,
    replay: ReplayCache,
}

/// Dono da coleção de fichas em memória.
///
/// Toda transição passa pela máquina de estados, é aplicada de forma otimista
/// no cache e só então repassada ao backend. Se o backend falhar, o cache volta
/// para a versão anterior.
pub struct BoardService {
    store: Arc<dyn ApplicationStore>,
    calendar: BusinessCalendar,
    state: RwLock<BoardState>,
}

impl BoardService {
    pub fn new(store: Arc<dyn ApplicationStore>, calendar: BusinessCalendar) -> Self {
        Self {
            store,
            calendar,
            state: RwLock::new(BoardState::default()),
        }
    }

    /// Leitura em massa pelo colaborador; atualiza o cache.
    pub async fn load(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, AppError> {
        let applications = self
            .store
            .load_applications(filter)
            .await
            .map_err(collaborator_failure)?;

        let mut state = self.state.write().await;
        // Carga sem recorte substitui tudo (fichas apagadas por fora somem)
        if filter.company_id.is_none()
            && filter.column.is_none()
            && filter.analyst.is_none()
            && filter.query.is_none()
        {
            state.applications.clear();
        }
        for app in &applications {
            state.applications.insert(app.id, app.clone());
        }

        tracing::debug!("{} fichas carregadas", applications.len());
        Ok(applications)
    }

    /// As seis colunas com os cartões já filtrados.
    pub async fn board(&self, filter: &ApplicationFilter, now: DateTime<Utc>) -> Result<BoardView, AppError> {
        let applications = self.load(filter).await?;
        Ok(self.build_board(applications, filter, now))
    }

    fn build_board(
        &self,
        applications: Vec<Application>,
        filter: &ApplicationFilter,
        now: DateTime<Utc>,
    ) -> BoardView {
        let mut visible: Vec<Application> = applications
            .into_iter()
            .filter(|app| self.matches(app, filter, now))
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let columns = Column::ALL
            .iter()
            .map(|&column| BoardColumn {
                column,
                title: column.title().to_string(),
                cards: visible
                    .iter()
                    .filter(|app| app.column == column)
                    .map(|app| self.card_view(app.clone(), now))
                    .collect(),
            })
            .collect();

        BoardView { columns, generated_at: now }
    }

    fn matches(&self, app: &Application, filter: &ApplicationFilter, now: DateTime<Utc>) -> bool {
        if filter.company_id.is_some() && app.company_id != filter.company_id {
            return false;
        }
        if filter.column.is_some_and(|c| c != app.column) {
            return false;
        }
        if filter.analyst.is_some() && app.assigned_analyst != filter.analyst {
            return false;
        }
        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            let in_name = app.customer_name.to_lowercase().contains(&query);
            let in_note = app.decision_note.to_lowercase().contains(&query);
            if !in_name && !in_note {
                return false;
            }
        }
        match filter.deadline {
            DeadlineFilter::Todos => true,
            DeadlineFilter::Hoje => self.calendar.is_due_today(app.deadline, now),
            DeadlineFilter::Atrasados => self.calendar.is_past_deadline(app.deadline, now),
        }
    }

    pub fn card_view(&self, application: Application, now: DateTime<Utc>) -> CardView {
        CardView {
            overdue: self.calendar.application_overdue(&application, now),
            on_fire: self.calendar.is_on_fire(application.column, application.deadline, now),
            display_labels: self.calendar.display_labels(&application, now),
            application,
        }
    }

    pub async fn get(&self, id: Uuid, actor: &Profile) -> Result<Application, AppError> {
        let cached = self.state.read().await.applications.get(&id).cloned();
        let app = match cached {
            Some(app) => app,
            None => self.fetch(id).await?,
        };
        ensure_visible(&app, actor)?;
        Ok(app)
    }

    async fn fetch(&self, id: Uuid) -> Result<Application, AppError> {
        self.store
            .get_application(id)
            .await
            .map_err(collaborator_failure)?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Ficha {}", id)))
    }

    pub async fn create(&self, new: NewApplication, actor: &Profile) -> Result<Application, AppError> {
        if !actor.can(Permission::ApplicationsCreate) {
            return Err(AppError::PermissionDenied);
        }

        let app = self
            .store
            .insert_application(&new, actor)
            .await
            .map_err(collaborator_failure)?;

        self.state.write().await.applications.insert(app.id, app.clone());
        tracing::info!("Ficha {} criada por {}", app.id, actor.id);
        Ok(app)
    }

    /// Aplica um evento do quadro. As transições são serializadas: o lock de
    /// escrita fica preso até o backend responder.
    pub async fn transition(
        &self,
        id: Uuid,
        event: BoardEvent,
        actor: &Profile,
        idempotency_key: Option<&str>,
    ) -> Result<TransitionOutcome, AppError> {
        let mut state = self.state.write().await;

        let replay_key = idempotency_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| (actor.id, id, k.to_string()));
        if let Some(outcome) = replay_key.as_ref().and_then(|k| state.replay.get(k)) {
            tracing::debug!("Reaproveitando resposta idempotente da ficha {}", id);
            return Ok(outcome);
        }

        let current = match state.applications.get(&id).cloned() {
            Some(app) => app,
            None => self.fetch(id).await?,
        };
        ensure_visible(&current, actor)?;

        let event_name = event.name();
        let plan = KanbanFlow::plan(&current, event, actor, Utc::now())?;

        // Otimista: o cache já reflete o novo estado
        state.applications.insert(id, plan.application.clone());

        let persisted = self
            .store
            .save_transition(&plan.application, plan.status_change.as_ref(), actor)
            .await;

        if let Err(e) = persisted {
            state.applications.insert(id, current);
            tracing::warn!("Transição {} da ficha {} desfeita: {}", event_name, id, e);
            return Err(collaborator_failure(e));
        }

        let mut application = plan.application;
        let routing = if plan.needs_routing {
            let routing = self.route(id, actor).await;
            if let Some(reanalyst) = routing.reanalyst {
                application.reanalyst = Some(reanalyst);
                state.applications.insert(id, application.clone());
            }
            Some(routing)
        } else {
            None
        };

        tracing::info!(
            "Ficha {}: {} ({} -> {})",
            id,
            event_name,
            current.column,
            application.column
        );

        let outcome = TransitionOutcome { application, routing };
        if let Some(key) = replay_key {
            state.replay.put(key, outcome.clone());
        }
        Ok(outcome)
    }

    /// Salva a edição da ficha. A coluna e `last_moved_at` ficam como estão.
    pub async fn update_details(
        &self,
        id: Uuid,
        edit: ApplicationEdit,
        actor: &Profile,
    ) -> Result<Application, AppError> {
        let mut state = self.state.write().await;
        let current = match state.applications.get(&id).cloned() {
            Some(app) => app,
            None => self.fetch(id).await?,
        };
        ensure_visible(&current, actor)?;

        // Reanalista só edita o que está em reanálise
        let allowed = actor.can(Permission::ApplicationsDecide)
            || (current.column == Column::Reanalysis && actor.can(Permission::ReanalysisDecide));
        if !allowed {
            return Err(AppError::PermissionDenied);
        }
        if edit.decision_note.trim().is_empty() {
            return Err(AppError::DecisionNoteRequired);
        }

        let mut next = current;
        edit.apply_to(&mut next, Utc::now());

        self.store
            .update_card(&next, actor)
            .await
            .map_err(collaborator_failure)?;

        state.applications.insert(id, next.clone());
        tracing::info!("Ficha {} editada por {}", id, actor.id);
        Ok(next)
    }

    // A mudança de coluna já foi gravada; falha no roteamento só é registrada
    async fn route(&self, id: Uuid, actor: &Profile) -> RoutingResult {
        match self.store.route_application(id, actor).await {
            Ok(candidate) => {
                match candidate {
                    Some(reanalyst) => tracing::info!("Ficha {} roteada para {}", id, reanalyst),
                    None => tracing::info!("Ficha {} sem reanalista disponível", id),
                }
                RoutingResult::from_candidate(candidate)
            }
            Err(e) => {
                tracing::warn!("Falha ao rotear ficha {}: {}", id, e);
                RoutingResult::from_candidate(None)
            }
        }
    }

    pub async fn delete(&self, id: Uuid, reason: &str, actor: &Profile) -> Result<(), AppError> {
        if !actor.can(Permission::ApplicationsDelete) {
            return Err(AppError::PermissionDenied);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::DeleteReasonRequired);
        }

        let mut state = self.state.write().await;
        let current = match state.applications.get(&id).cloned() {
            Some(app) => app,
            None => self.fetch(id).await?,
        };
        ensure_visible(&current, actor)?;

        self.store
            .delete_application(id, reason, actor)
            .await
            .map_err(collaborator_failure)?;

        state.applications.remove(&id);
        tracing::info!("Ficha {} excluída por {}: {}", id, actor.id, reason);
        Ok(())
    }

    /// Fichas atrasadas agora, sem I/O.
    pub async fn overdue_ids(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let state = self.state.read().await;
        let mut ids: Vec<Uuid> = state
            .applications
            .values()
            .filter(|app| self.calendar.application_overdue(app, now))
            .map(|app| app.id)
            .collect();
        ids.sort();
        ids
    }
}

/// Recalcula os atrasos periodicamente e registra as fichas que acabaram de estourar.
pub fn spawn_overdue_monitor(service: Arc<BoardService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut known: HashSet<Uuid> = HashSet::new();

        loop {
            ticker.tick().await;
            let current: HashSet<Uuid> = service.overdue_ids(Utc::now()).await.into_iter().collect();
            for id in current.difference(&known) {
                tracing::warn!("Ficha {} passou do prazo de SLA", id);
            }
            known = current;
        }
    })
}

fn ensure_visible(app: &Application, actor: &Profile) -> Result<(), AppError> {
    if actor.sees_all_companies() || actor.same_company(app.company_id) {
        Ok(())
    } else {
        // Não revela fichas de outra empresa
        Err(AppError::ResourceNotFound(format!("Ficha {}", app.id)))
    }
}

fn collaborator_failure(e: AppError) -> AppError {
    match e {
        AppError::ResourceNotFound(_) | AppError::CollaboratorFailure(_) => e,
        other => AppError::CollaboratorFailure(other.to_string()),
    }
}
