//! Data Orchestration Layer
//!
//! Turns an established identity into the three per-user loads (topics,
//! learnings, timeline) and keeps the loaded state with its derived
//! dashboard aggregate.
//!
//! Loads for one identity run inside a [`LoadScope`]. Dropping the scope
//! aborts whatever is still in flight, and every result is tagged with the
//! generation it was started for, so a superseded identity can never write
//! into the state of the current one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use crate::auth::models::SessionState;
use crate::error::CatalogError;
use crate::services::catalog::LearningBackend;
use crate::services::models::{Learning, NewTimelineEvent, TimelineEvent, Topic};
use crate::services::stats::{DashboardStats, compute_dashboard_stats};

/// Everything loaded for the current identity.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningState {
    pub topics: Vec<Topic>,
    pub learnings: Vec<Learning>,
    pub timeline: Vec<TimelineEvent>,
    pub dashboard_stats: DashboardStats,
    pub pending_loads: usize,
    #[serde(skip)]
    pub generation: u64,
}

impl LearningState {
    pub fn is_loading(&self) -> bool {
        self.pending_loads > 0
    }

    fn apply_topics(&mut self, topics: Vec<Topic>) {
        self.topics = topics;
        self.recompute_stats();
    }

    fn apply_learnings(&mut self, learnings: Vec<Learning>) {
        self.learnings = learnings;
        self.recompute_stats();
    }

    fn apply_timeline(&mut self, timeline: Vec<TimelineEvent>) {
        self.timeline = timeline;
    }

    /// Only fires on a non-empty learnings collection.
    fn recompute_stats(&mut self) {
        if let Some(stats) = compute_dashboard_stats(&self.learnings, &self.topics) {
            self.dashboard_stats = stats;
        }
    }
}

/// Loads dispatched for one identity. Dropping it cancels them.
pub struct LoadScope {
    generation: u64,
    state: Arc<RwLock<LearningState>>,
    tasks: JoinSet<()>,
}

impl LoadScope {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for every load in the scope to land.
    pub async fn finish(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    tracing::error!("[Orchestrator] load task panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for LoadScope {
    // Aborted loads never report back, so the scope settles the counter.
    fn drop(&mut self) {
        self.tasks.abort_all();
        let mut state = self.state.write();
        if state.generation == self.generation && state.pending_loads > 0 {
            tracing::debug!(
                "[Orchestrator] generation {} cancelled with {} loads pending",
                self.generation,
                state.pending_loads
            );
            state.pending_loads = 0;
        }
    }
}

pub struct DataOrchestrator {
    backend: Arc<dyn LearningBackend>,
    state: Arc<RwLock<LearningState>>,
    generation: AtomicU64,
}

impl DataOrchestrator {
    pub fn new(backend: Arc<dyn LearningBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(LearningState::default())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> LearningState {
        self.state.read().clone()
    }

    pub fn backend(&self) -> &Arc<dyn LearningBackend> {
        &self.backend
    }

    /// Dispatch topics, learnings and timeline loads for `user_id`.
    ///
    /// With no identity nothing is dispatched. Every call with an identity
    /// fires all three loads; there is no "already loaded" check. Must be
    /// called from within a Tokio runtime.
    pub fn on_identity_established(&self, user_id: Option<&str>) -> Option<LoadScope> {
        let user_id = user_id?.to_string();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write();
            state.generation = generation;
            state.pending_loads = 3;
        }
        tracing::info!("[Orchestrator] loading data for {} (generation {})", user_id, generation);

        let mut tasks = JoinSet::new();

        let (backend, state) = (self.backend.clone(), self.state.clone());
        tasks.spawn(async move {
            let topics = backend.fetch_topics().await;
            apply_if_current(&state, generation, |s| s.apply_topics(topics));
        });

        let (backend, state, id) = (self.backend.clone(), self.state.clone(), user_id.clone());
        tasks.spawn(async move {
            let learnings = backend.fetch_learnings(&id).await;
            apply_if_current(&state, generation, |s| s.apply_learnings(learnings));
        });

        let (backend, state, id) = (self.backend.clone(), self.state.clone(), user_id);
        tasks.spawn(async move {
            let timeline = backend.fetch_timeline(&id).await;
            apply_if_current(&state, generation, |s| s.apply_timeline(timeline));
        });

        Some(LoadScope {
            generation,
            state: self.state.clone(),
            tasks,
        })
    }

    /// Load everything for `user_id` and return the resulting state.
    pub async fn load_for(&self, user_id: &str) -> LearningState {
        if let Some(scope) = self.on_identity_established(Some(user_id)) {
            scope.finish().await;
        }
        self.snapshot()
    }

    /// Forget loaded data. Results still in flight are discarded.
    pub fn reset(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write() = LearningState {
            generation,
            ..LearningState::default()
        };
    }

    /// Update one of the loaded learnings. Only learnings of the current
    /// identity are reachable.
    pub async fn update_learning_progress(&self, learning_id: &str, progress: u8) -> Result<Learning, CatalogError> {
        let known = self.state.read().learnings.iter().any(|l| l.id == learning_id);
        if !known {
            return Err(CatalogError::LearningNotFound(learning_id.to_string()));
        }

        let updated = self.backend.update_progress(learning_id, progress).await?;

        let mut state = self.state.write();
        if let Some(slot) = state.learnings.iter_mut().find(|l| l.id == updated.id) {
            *slot = updated.clone();
        }
        state.recompute_stats();
        Ok(updated)
    }

    pub async fn add_timeline_event(&self, event: NewTimelineEvent) -> TimelineEvent {
        let event = self.backend.add_timeline_event(event).await;
        self.state.write().timeline.push(event.clone());
        event
    }
}

fn apply_if_current(state: &RwLock<LearningState>, generation: u64, apply: impl FnOnce(&mut LearningState)) {
    let mut state = state.write();
    if state.generation != generation {
        tracing::debug!(
            "[Orchestrator] dropping result of generation {} (current {})",
            generation,
            state.generation
        );
        return;
    }
    apply(&mut state);
    state.pending_loads = state.pending_loads.saturating_sub(1);
}

/// Fires the orchestrator once per transition into a non-null identity.
///
/// Transitions are keyed on user id: a role change for the same user does
/// not re-fetch, a logout followed by a login does.
pub struct IdentityWatcher {
    orchestrator: Arc<DataOrchestrator>,
    current: Option<String>,
    scope: Option<LoadScope>,
}

impl IdentityWatcher {
    pub fn new(orchestrator: Arc<DataOrchestrator>) -> Self {
        Self {
            orchestrator,
            current: None,
            scope: None,
        }
    }

    /// React to a published session state. Returns true when loads were
    /// dispatched.
    pub fn observe(&mut self, state: &SessionState) -> bool {
        let next = state
            .user_id()
            .filter(|_| state.is_authenticated)
            .map(str::to_string);
        if next == self.current {
            return false;
        }

        let dispatched = match next.as_deref() {
            Some(user_id) => {
                self.scope = self.orchestrator.on_identity_established(Some(user_id));
                true
            }
            None => {
                tracing::debug!("[Orchestrator] identity cleared");
                self.scope = None;
                self.orchestrator.reset();
                false
            }
        };
        self.current = next;
        dispatched
    }

    /// Hand over the in-flight scope, e.g. to await it.
    pub fn take_scope(&mut self) -> Option<LoadScope> {
        self.scope.take()
    }

    /// Follow `rx` until the session manager goes away.
    pub async fn run(mut self, mut rx: watch::Receiver<SessionState>) {
        loop {
            let state = rx.borrow_and_update().clone();
            self.observe(&state);
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn spawn(self, rx: watch::Receiver<SessionState>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }
}
