use crate::error::{AppError, Result};
use crate::models::Objective;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::OkrStore;

/// Process-local store with the same versioning rules as the sqlite one.
#[derive(Default)]
pub struct MemoryStore {
    objectives: RwLock<HashMap<Uuid, Objective>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OkrStore for MemoryStore {
    async fn insert_objective(&self, objective: &Objective) -> Result<()> {
        let mut objectives = self.objectives.write().await;
        if objectives.contains_key(&objective.id) {
            return Err(AppError::Database(format!(
                "Objective {} already exists",
                objective.id
            )));
        }
        objectives.insert(objective.id, objective.clone());
        Ok(())
    }

    async fn find_objective(&self, id: Uuid) -> Result<Option<Objective>> {
        Ok(self.objectives.read().await.get(&id).cloned())
    }

    async fn list_objectives(&self, quarter: Option<&str>) -> Result<Vec<Objective>> {
        let objectives = self.objectives.read().await;
        let mut matching: Vec<Objective> = objectives
            .values()
            .filter(|o| quarter.map_or(true, |q| o.quarter == q))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn save_objective(&self, objective: &Objective) -> Result<()> {
        let mut objectives = self.objectives.write().await;
        let stored = objectives
            .get_mut(&objective.id)
            .ok_or_else(|| AppError::NotFound(format!("Objective {}", objective.id)))?;

        if stored.version != objective.version {
            return Err(AppError::Conflict(format!(
                "Objective {} was modified concurrently (expected version {}, found {})",
                objective.id, objective.version, stored.version
            )));
        }

        *stored = objective.clone();
        stored.version += 1;
        Ok(())
    }

    async fn delete_objective(&self, id: Uuid) -> Result<bool> {
        Ok(self.objectives.write().await.remove(&id).is_some())
    }
}
