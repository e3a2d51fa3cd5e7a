//! In-memory task collection kept in sync with a [`TaskGateway`].
//!
//! Every mutation commits locally first, then persists the whole collection.
//! When the save fails the affected task alone is put back and the error is
//! recorded in the store state; the action itself still returns normally.

use std::convert::Infallible;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;

use crate::capture::CaptureInput;
use crate::clock::{Clock, SystemClock};
use crate::error::{CaptureError, StoreError, ValidationError};
use crate::gateway::TaskGateway;
use crate::migration::{Migrator, NoMigration};
use crate::model::{NewTask, Placement, Quadrant, Task, TaskPatch};
use crate::operations;
use crate::parser;
use crate::views::{Board, TodayLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug)]
struct StoreState {
    tasks: Vec<Task>,
    phase: StorePhase,
    is_loading: bool,
    error: Option<StoreError>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            phase: StorePhase::Idle,
            is_loading: false,
            error: None,
        }
    }
}

/// How to undo one optimistic change if its save fails.
#[derive(Debug)]
enum Rollback {
    Remove(String),
    Restore(Task),
    Reinsert { index: usize, task: Task },
}

impl Rollback {
    fn apply(self, tasks: &mut Vec<Task>) {
        match self {
            Rollback::Remove(id) => tasks.retain(|t| t.id != id),
            Rollback::Restore(previous) => {
                if let Some(slot) = tasks.iter_mut().find(|t| t.id == previous.id) {
                    *slot = previous;
                }
            }
            Rollback::Reinsert { index, task } => {
                if tasks.iter().all(|t| t.id != task.id) {
                    let index = index.min(tasks.len());
                    tasks.insert(index, task);
                }
            }
        }
    }
}

struct Applied {
    task: Task,
    rollback: Rollback,
}

fn settled(result: Result<Option<Task>, Infallible>) -> Option<Task> {
    match result {
        Ok(task) => task,
        Err(never) => match never {},
    }
}

pub struct TaskStore {
    gateway: Arc<dyn TaskGateway>,
    migrator: Arc<dyn Migrator>,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
}

impl TaskStore {
    pub fn new(gateway: Arc<dyn TaskGateway>) -> Self {
        Self {
            gateway,
            migrator: Arc::new(NoMigration),
            clock: Arc::new(SystemClock),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn with_migrator(mut self, migrator: Arc<dyn Migrator>) -> Self {
        self.migrator = migrator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run the one-shot migration, then load the persisted collection.
    ///
    /// On failure the previous tasks stay in memory, the phase becomes
    /// [`StorePhase::Failed`] and the error is available from [`Self::error`].
    pub async fn init(&self) {
        {
            let mut state = self.state.lock();
            state.phase = StorePhase::Loading;
            state.is_loading = true;
            state.error = None;
        }

        let loaded = match self.migrator.migrate_if_needed().await {
            Ok(report) => {
                tracing::debug!(?report, "migration check finished");
                self.gateway.load_tasks().await.map_err(StoreError::from)
            }
            Err(err) => Err(StoreError::from(err)),
        };

        let mut state = self.state.lock();
        state.is_loading = false;
        match loaded {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "task store ready");
                state.tasks = tasks;
                state.phase = StorePhase::Ready;
            }
            Err(err) => {
                tracing::warn!(error = %err, "task store failed to initialize");
                state.error = Some(err);
                state.phase = StorePhase::Failed;
            }
        }
    }

    pub async fn retry(&self) {
        self.init().await
    }

    /// Drop the in-memory collection and return to [`StorePhase::Idle`].
    pub fn dispose(&self) {
        *self.state.lock() = StoreState::default();
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn phase(&self) -> StorePhase {
        self.state.lock().phase
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn error(&self) -> Option<StoreError> {
        self.state.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }

    /// Calendar date used to resolve relative due phrases.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn board(&self, layout: TodayLayout) -> Board {
        Board::build(&self.state.lock().tasks, layout)
    }

    pub async fn create_task(&self, data: NewTask) -> Result<Task, ValidationError> {
        let task = operations::create_task(data, self.clock.now())?;
        let pending = task.clone();
        settled(
            self.attempt("create", move |tasks, _now| {
                tasks.push(pending.clone());
                Ok(Some(Applied {
                    rollback: Rollback::Remove(pending.id.clone()),
                    task: pending,
                }))
            })
            .await,
        );
        Ok(task)
    }

    /// Parse free text plus explicit overrides and create the resulting task.
    pub async fn capture(&self, input: &CaptureInput) -> Result<Task, CaptureError> {
        let data = parser::prepare_new_task(input, self.clock.today())?;
        Ok(self.create_task(data).await?)
    }

    pub async fn capture_text(&self, text: &str) -> Result<Task, CaptureError> {
        self.capture(&CaptureInput::from_text(text)).await
    }

    pub async fn update_task(
        &self,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, ValidationError> {
        self.modify("update", id, |task, now| {
            operations::update_task(task, patch, now)
        })
        .await
    }

    /// Returns the removed task, or `None` when the id is unknown.
    pub async fn delete_task(&self, id: &str) -> Option<Task> {
        settled(
            self.attempt("delete", |tasks, _now| {
                let Some(index) = tasks.iter().position(|t| t.id == id) else {
                    return Ok(None);
                };
                let removed = tasks.remove(index);
                Ok(Some(Applied {
                    rollback: Rollback::Reinsert {
                        index,
                        task: removed.clone(),
                    },
                    task: removed,
                }))
            })
            .await,
        )
    }

    pub async fn move_task_to_quadrant(&self, id: &str, quadrant: Quadrant) -> Option<Task> {
        settled(
            self.modify("move", id, |task, now| {
                Ok(operations::move_task_to_quadrant(task, quadrant, now))
            })
            .await,
        )
    }

    pub async fn pin_task_to_today(&self, id: &str) -> Option<Task> {
        settled(
            self.modify("pin", id, |task, now| {
                Ok(operations::pin_task_to_today(task, now))
            })
            .await,
        )
    }

    pub async fn unpin_task_from_today(&self, id: &str) -> Option<Task> {
        settled(
            self.modify("unpin", id, |task, now| {
                Ok(operations::unpin_task_from_today(task, now))
            })
            .await,
        )
    }

    pub async fn complete_task(&self, id: &str) -> Option<Task> {
        settled(
            self.modify("complete", id, |task, now| {
                Ok(operations::complete_task(task, now))
            })
            .await,
        )
    }

    pub async fn uncomplete_task(&self, id: &str) -> Option<Task> {
        settled(
            self.modify("uncomplete", id, |task, now| {
                Ok(operations::uncomplete_task(task, now))
            })
            .await,
        )
    }

    /// Apply a drop onto today, the inbox or a quadrant.
    pub async fn place(&self, id: &str, placement: Placement) -> Option<Task> {
        settled(
            self.modify("place", id, |task, now| {
                Ok(operations::place_task(task, placement, now))
            })
            .await,
        )
    }

    /// Empty the collection and the backing storage. Returns how many tasks were dropped.
    ///
    /// If storage cannot be cleared, the previous collection comes back in
    /// full, ahead of anything created while the clear was in flight.
    pub async fn clear_all(&self) -> usize {
        let previous = std::mem::take(&mut self.state.lock().tasks);
        let count = previous.len();

        match self.gateway.clear().await {
            Ok(()) => {
                tracing::debug!(count, "cleared all tasks");
                count
            }
            Err(err) => {
                tracing::warn!(count, error = %err, "clear failed; restoring tasks");
                let mut state = self.state.lock();
                let added = std::mem::replace(&mut state.tasks, previous);
                state.tasks.extend(added);
                state.error = Some(err.into());
                0
            }
        }
    }

    async fn modify<E, F>(&self, action: &'static str, id: &str, op: F) -> Result<Option<Task>, E>
    where
        F: FnOnce(&Task, DateTime<Utc>) -> Result<Task, E>,
    {
        self.attempt(action, |tasks, now| {
            let Some(slot) = tasks.iter_mut().find(|t| t.id == id) else {
                return Ok(None);
            };
            let updated = op(slot, now)?;
            let previous = std::mem::replace(slot, updated.clone());
            Ok(Some(Applied {
                task: updated,
                rollback: Rollback::Restore(previous),
            }))
        })
        .await
    }

    /// Commit `apply` locally, persist the collection, and undo on failure.
    ///
    /// `apply` returning `Ok(None)` means nothing matched; persistence is skipped.
    async fn attempt<E, F>(&self, action: &'static str, apply: F) -> Result<Option<Task>, E>
    where
        F: FnOnce(&mut Vec<Task>, DateTime<Utc>) -> Result<Option<Applied>, E>,
    {
        let now = self.clock.now();
        let (applied, snapshot) = {
            let mut state = self.state.lock();
            match apply(&mut state.tasks, now)? {
                Some(applied) => (applied, state.tasks.clone()),
                None => {
                    tracing::debug!(action, "no matching task; nothing to save");
                    return Ok(None);
                }
            }
        };

        match self.gateway.save_tasks(&snapshot).await {
            Ok(()) => {
                tracing::debug!(
                    action,
                    task_id = applied.task.id.as_str(),
                    count = snapshot.len(),
                    "saved tasks"
                );
            }
            Err(err) => {
                tracing::warn!(
                    action,
                    task_id = applied.task.id.as_str(),
                    error = %err,
                    "save failed; rolling back"
                );
                let mut state = self.state.lock();
                applied.rollback.apply(&mut state.tasks);
                state.error = Some(err.into());
            }
        }
        Ok(Some(applied.task))
    }
}
