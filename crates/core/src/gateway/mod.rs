//! Durable storage contract consumed by the store, plus its implementations.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::Task;

pub use memory::MemoryGateway;
pub use sqlite::SqliteGateway;

/// Bulk persistence of the task collection.
///
/// `save_tasks` has whole-collection replace semantics: after it returns `Ok`
/// the stored set equals `tasks`, in that order.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError>;

    async fn load_tasks(&self) -> Result<Vec<Task>, StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}
