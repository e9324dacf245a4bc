pub mod memory;
pub mod operations;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteDatabase;

use crate::error::Result;
use crate::models::Objective;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence for objectives and the key results they own.
///
/// Every read returns objectives with their key results embedded.
/// `save_objective` is the unit of work for all key result changes: it
/// writes the objective row, its derived metrics and its complete key
/// result set atomically, and only if `objective.version` still matches the
/// stored version. A stale version yields `AppError::Conflict`.
#[async_trait]
pub trait OkrStore: Send + Sync {
    async fn insert_objective(&self, objective: &Objective) -> Result<()>;

    async fn find_objective(&self, id: Uuid) -> Result<Option<Objective>>;

    /// Newest first. `quarter` is matched verbatim.
    async fn list_objectives(&self, quarter: Option<&str>) -> Result<Vec<Objective>>;

    async fn save_objective(&self, objective: &Objective) -> Result<()>;

    /// Removes the objective and all of its key results.
    async fn delete_objective(&self, id: Uuid) -> Result<bool>;
}
