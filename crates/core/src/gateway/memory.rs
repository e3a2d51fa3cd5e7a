use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::TaskGateway;
use crate::error::StorageError;
use crate::model::Task;

/// In-process gateway with switchable failures.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    tasks: Mutex<Vec<Task>>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    fail_clears: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryGateway {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clears(&self, fail: bool) {
        self.fail_clears.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }
}

#[async_trait]
impl TaskGateway for MemoryGateway {
    async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::new(
                "Failed to save tasks",
                anyhow!("memory gateway configured to fail saves"),
            ));
        }
        *self.tasks.lock() = tasks.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::new(
                "Failed to load tasks",
                anyhow!("memory gateway configured to fail loads"),
            ));
        }
        Ok(self.tasks.lock().clone())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        if self.fail_clears.load(Ordering::SeqCst) {
            return Err(StorageError::new(
                "Failed to clear tasks",
                anyhow!("memory gateway configured to fail clears"),
            ));
        }
        self.tasks.lock().clear();
        Ok(())
    }
}
