//! Entry point for every OKR operation.
//!
//! Each call is a self-contained read-modify-write against the store: load
//! the objective aggregate, check the gate, mutate in memory (which keeps the
//! derived metrics current), then persist with one versioned
//! `save_objective` and hand back the stored copy.

pub mod ids;

pub use ids::{IdGenerator, UuidV4};

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::OkrStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    KeyResult, KeyResultPatch, NewKeyResult, NewObjective, Objective, ObjectivePatch,
    OkrOverviewMetrics,
};
use crate::permissions::{OkrAction, PermissionGate};

pub struct OkrService {
    store: Arc<dyn OkrStore>,
    gate: Arc<dyn PermissionGate>,
    ids: Arc<dyn IdGenerator>,
}

/// Logs store failures before they are handed back to the caller.
fn logged<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_client_error() {
            tracing::warn!("Failed to {}: {}", operation, e);
        } else {
            tracing::error!("Failed to {}: {}", operation, e);
        }
    }
    result
}

fn objective_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Objective {} not found", id))
}

impl OkrService {
    pub fn new(store: Arc<dyn OkrStore>, gate: Arc<dyn PermissionGate>) -> Self {
        Self {
            store,
            gate,
            ids: Arc::new(UuidV4),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    async fn authorize(
        &self,
        user_id: &str,
        action: OkrAction,
        resource_id: Option<Uuid>,
    ) -> Result<()> {
        if self.gate.authorize(user_id, action, resource_id).await {
            return Ok(());
        }
        tracing::warn!("Permission denied: user {} may not {}", user_id, action);
        Err(AppError::PermissionDenied(format!(
            "user {} may not {}",
            user_id, action
        )))
    }

    /// Reads are never refused. The gate is still consulted so a policy can
    /// observe them.
    async fn note_read(&self, user_id: &str, action: OkrAction, resource_id: Option<Uuid>) {
        if !self.gate.authorize(user_id, action, resource_id).await {
            tracing::debug!("Gate refused {} for user {}, serving it anyway", action, user_id);
        }
    }

    async fn load(&self, id: Uuid) -> Result<Option<Objective>> {
        logged("load objective", self.store.find_objective(id).await)
    }

    async fn load_existing(&self, id: Uuid) -> Result<Objective> {
        self.load(id).await?.ok_or_else(|| objective_not_found(id))
    }

    /// Saves the mutated aggregate and returns the stored copy.
    async fn commit(&self, objective: &Objective) -> Result<Objective> {
        logged("save objective", self.store.save_objective(objective).await)?;
        self.load_existing(objective.id).await
    }

    pub async fn create_objective(&self, user_id: &str, data: NewObjective) -> Result<Objective> {
        self.authorize(user_id, OkrAction::CreateObjective, None).await?;
        data.validate()?;

        let objective = data.into_objective(self.ids.next_id());
        logged(
            "create objective",
            self.store.insert_objective(&objective).await,
        )?;

        tracing::info!(
            "Created objective {} ({}) for {}",
            objective.id,
            objective.title,
            objective.quarter
        );
        Ok(objective)
    }

    pub async fn get_objective_by_id(&self, user_id: &str, id: Uuid) -> Result<Option<Objective>> {
        self.note_read(user_id, OkrAction::GetObjective, Some(id)).await;
        self.load(id).await
    }

    /// Every objective, or only those whose quarter equals `quarter` exactly.
    pub async fn get_all_objectives(
        &self,
        user_id: &str,
        quarter: Option<&str>,
    ) -> Result<Vec<Objective>> {
        self.note_read(user_id, OkrAction::GetAllObjectives, None).await;
        logged("list objectives", self.store.list_objectives(quarter).await)
    }

    pub async fn update_objective(
        &self,
        user_id: &str,
        id: Uuid,
        patch: ObjectivePatch,
    ) -> Result<Option<Objective>> {
        let mut objective = match self.load(id).await? {
            Some(objective) => objective,
            None => return Ok(None),
        };
        self.authorize(user_id, OkrAction::UpdateObjective, Some(id)).await?;
        patch.validate()?;

        patch.apply_to(&mut objective);
        let updated = self.commit(&objective).await?;

        tracing::info!("Updated objective {}", id);
        Ok(Some(updated))
    }

    /// Deletes the objective together with its key results. False when
    /// there was nothing to delete.
    pub async fn delete_objective(&self, user_id: &str, id: Uuid) -> Result<bool> {
        if self.load(id).await?.is_none() {
            return Ok(false);
        }
        self.authorize(user_id, OkrAction::DeleteObjective, Some(id)).await?;

        let deleted = logged("delete objective", self.store.delete_objective(id).await)?;
        if deleted {
            tracing::info!("Deleted objective {}", id);
        }
        Ok(deleted)
    }

    pub async fn add_key_result(
        &self,
        user_id: &str,
        objective_id: Uuid,
        data: NewKeyResult,
    ) -> Result<Objective> {
        let mut objective = self.load_existing(objective_id).await?;
        self.authorize(user_id, OkrAction::AddKeyResult, Some(objective_id))
            .await?;
        data.validate()?;

        let kr = data.into_key_result(self.ids.next_id(), objective_id);
        let kr_id = kr.id;
        objective.add_key_result(kr);
        let updated = self.commit(&objective).await?;

        tracing::info!("Added key result {} to objective {}", kr_id, objective_id);
        Ok(updated)
    }

    /// Allowed for anyone the gate authorizes, and always for the key
    /// result's own `responsible`.
    pub async fn update_key_result(
        &self,
        user_id: &str,
        objective_id: Uuid,
        kr_id: Uuid,
        patch: KeyResultPatch,
    ) -> Result<Objective> {
        let mut objective = self.load_existing(objective_id).await?;
        let mut kr = objective.key_result(kr_id).cloned().ok_or_else(|| {
            AppError::NotFound(format!(
                "Key result {} not found in objective {}",
                kr_id, objective_id
            ))
        })?;

        let permitted = self
            .gate
            .authorize(user_id, OkrAction::UpdateKeyResult, Some(objective_id))
            .await
            || user_id == kr.responsible;
        if !permitted {
            tracing::warn!(
                "Permission denied: user {} may not update key result {}",
                user_id,
                kr_id
            );
            return Err(AppError::PermissionDenied(format!(
                "user {} may not {}",
                user_id,
                OkrAction::UpdateKeyResult
            )));
        }
        patch.validate()?;

        patch.apply_to(&mut kr);
        objective.update_key_result(kr);
        let updated = self.commit(&objective).await?;

        tracing::info!("Updated key result {} of objective {}", kr_id, objective_id);
        Ok(updated)
    }

    /// Unknown `kr_id`s are ignored and the objective is returned unchanged.
    pub async fn remove_key_result(
        &self,
        user_id: &str,
        objective_id: Uuid,
        kr_id: Uuid,
    ) -> Result<Objective> {
        let mut objective = self.load_existing(objective_id).await?;
        self.authorize(user_id, OkrAction::RemoveKeyResult, Some(objective_id))
            .await?;

        if !objective.remove_key_result(kr_id) {
            tracing::debug!(
                "Key result {} not in objective {}, nothing to remove",
                kr_id,
                objective_id
            );
            return Ok(objective);
        }

        let updated = self.commit(&objective).await?;
        tracing::info!("Removed key result {} from objective {}", kr_id, objective_id);
        Ok(updated)
    }

    /// Appends `note` and returns the updated key result, or `None` when the
    /// objective or key result does not exist.
    pub async fn add_note_to_key_result(
        &self,
        user_id: &str,
        objective_id: Uuid,
        kr_id: Uuid,
        note: &str,
    ) -> Result<Option<KeyResult>> {
        if note.is_empty() {
            return Err(AppError::InvalidInput("note must not be empty".to_string()));
        }

        let mut objective = match self.load(objective_id).await? {
            Some(objective) => objective,
            None => return Ok(None),
        };
        let mut kr = match objective.key_result(kr_id) {
            Some(kr) => kr.clone(),
            None => return Ok(None),
        };
        self.authorize(user_id, OkrAction::AddNoteToKeyResult, Some(objective_id))
            .await?;

        kr.add_note(note);
        objective.update_key_result(kr);
        let updated = self.commit(&objective).await?;

        tracing::info!("Added note to key result {}", kr_id);
        Ok(updated.key_result(kr_id).cloned())
    }

    pub async fn get_okr_overview_metrics(
        &self,
        user_id: &str,
        quarter: &str,
    ) -> Result<OkrOverviewMetrics> {
        self.note_read(user_id, OkrAction::GetOkrOverview, None).await;

        let objectives = logged(
            "list objectives",
            self.store.list_objectives(Some(quarter)).await,
        )?;

        let overview = metrics::overview(&objectives, quarter, Utc::now());
        tracing::debug!(
            "Overview for {}: {} objectives, {}/{} key results completed",
            quarter,
            objectives.len(),
            overview.tasks_completed,
            overview.total_tasks
        );
        Ok(overview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::{KrStatus, KrType};
    use crate::permissions::{AllowAll, AllowList};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct DenyAll;

    #[async_trait]
    impl PermissionGate for DenyAll {
        async fn authorize(&self, _user_id: &str, _action: OkrAction, _resource_id: Option<Uuid>) -> bool {
            false
        }
    }

    struct Sequential(AtomicU64);

    impl IdGenerator for Sequential {
        fn next_id(&self) -> Uuid {
            Uuid::from_u128(u128::from(self.0.fetch_add(1, Ordering::SeqCst)))
        }
    }

    fn service_with(gate: Arc<dyn PermissionGate>) -> OkrService {
        OkrService::new(Arc::new(MemoryStore::new()), gate)
    }

    fn service() -> OkrService {
        service_with(Arc::new(AllowAll))
    }

    fn deals_kr(current: f64) -> NewKeyResult {
        NewKeyResult::new(
            "Sign 10 deals",
            "Bob",
            KrType::Number,
            10.0,
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            70,
        )
        .with_current_value(current)
    }

    async fn grow_revenue(service: &OkrService) -> Objective {
        service
            .create_objective("Alice", NewObjective::new("Grow Revenue", "Alice", "Q3 2024"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_progress() {
        let service = service();
        let objective = grow_revenue(&service).await;
        assert!(objective.key_results.is_empty());
        assert_eq!(objective.overall_progress, 0.0);

        let objective = service
            .add_key_result("Alice", objective.id, deals_kr(4.0))
            .await
            .unwrap();
        assert_eq!(objective.key_results.len(), 1);
        assert_eq!(objective.overall_progress, 40.0);
        assert_eq!(objective.net_confidence_score, 70.0);

        let kr_id = objective.key_results[0].id;
        let objective = service
            .update_key_result(
                "Alice",
                objective.id,
                kr_id,
                KeyResultPatch {
                    current_value: Some(10.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(objective.overall_progress, 100.0);
        assert_eq!(objective.key_results[0].status, KrStatus::Planned);

        let stored = service
            .get_objective_by_id("Alice", objective.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.overall_progress, 100.0);
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let service = service();
        let err = service
            .create_objective("Alice", NewObjective::new("", "Alice", "Q3 2024"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(service.get_all_objectives("Alice", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_id_generator() {
        let service = service().with_id_generator(Arc::new(Sequential(AtomicU64::new(1))));
        let objective = grow_revenue(&service).await;
        assert_eq!(objective.id, Uuid::from_u128(1));

        let objective = service
            .add_key_result("Alice", objective.id, deals_kr(0.0))
            .await
            .unwrap();
        assert_eq!(objective.key_results[0].id, Uuid::from_u128(2));
        assert_eq!(objective.key_results[0].objective_id, objective.id);
    }

    #[tokio::test]
    async fn test_missing_targets() {
        let service = service();
        let missing = Uuid::new_v4();

        assert!(service.get_objective_by_id("Alice", missing).await.unwrap().is_none());
        assert!(service
            .update_objective("Alice", missing, ObjectivePatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(!service.delete_objective("Alice", missing).await.unwrap());

        let err = service
            .add_key_result("Alice", missing, deals_kr(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .remove_key_result("Alice", missing, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let objective = grow_revenue(&service).await;
        let err = service
            .update_key_result("Alice", objective.id, Uuid::new_v4(), KeyResultPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(service
            .add_note_to_key_result("Alice", objective.id, Uuid::new_v4(), "hello")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_key_result_is_tolerated() {
        let service = service();
        let objective = grow_revenue(&service).await;
        let objective = service
            .add_key_result("Alice", objective.id, deals_kr(5.0))
            .await
            .unwrap();

        let after = service
            .remove_key_result("Alice", objective.id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(after.key_results.len(), 1);
        assert_eq!(after.updated_at, objective.updated_at);
        assert_eq!(after.overall_progress, 50.0);

        let kr_id = objective.key_results[0].id;
        let after = service
            .remove_key_result("Alice", objective.id, kr_id)
            .await
            .unwrap();
        assert!(after.key_results.is_empty());
        assert_eq!(after.overall_progress, 0.0);
        assert_eq!(after.net_confidence_score, 0.0);
    }

    #[tokio::test]
    async fn test_notes() {
        let service = service();
        let objective = grow_revenue(&service).await;
        let objective = service
            .add_key_result("Alice", objective.id, deals_kr(5.0))
            .await
            .unwrap();
        let kr_id = objective.key_results[0].id;

        let err = service
            .add_note_to_key_result("Alice", objective.id, kr_id, "")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let blank = service
            .add_note_to_key_result("Alice", objective.id, kr_id, " ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(blank.notes, vec![" "]);

        service
            .add_note_to_key_result("Alice", objective.id, kr_id, "kickoff done")
            .await
            .unwrap();
        let kr = service
            .add_note_to_key_result("Alice", objective.id, kr_id, "kickoff done")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kr.notes, vec![" ", "kickoff done", "kickoff done"]);
    }

    #[tokio::test]
    async fn test_denied_actions() {
        let store: Arc<dyn OkrStore> = Arc::new(MemoryStore::new());
        let open = OkrService::new(store.clone(), Arc::new(AllowAll));
        let closed = OkrService::new(store, Arc::new(DenyAll));

        let err = closed
            .create_objective("Mallory", NewObjective::new("Grow", "Mallory", "Q3 2024"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let objective = grow_revenue(&open).await;
        let err = closed.delete_objective("Mallory", objective.id).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert!(open.get_objective_by_id("Alice", objective.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refused_reads_are_still_served() {
        let store: Arc<dyn OkrStore> = Arc::new(MemoryStore::new());
        let open = OkrService::new(store.clone(), Arc::new(AllowAll));
        let closed = OkrService::new(store, Arc::new(DenyAll));

        let objective = grow_revenue(&open).await;
        open.add_key_result("Alice", objective.id, deals_kr(4.0))
            .await
            .unwrap();

        let found = closed
            .get_objective_by_id("Mallory", objective.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.key_results.len(), 1);

        let listed = closed.get_all_objectives("Mallory", None).await.unwrap();
        assert_eq!(listed.len(), 1);

        let overview = closed
            .get_okr_overview_metrics("Mallory", "Q3 2024")
            .await
            .unwrap();
        assert_eq!(overview.total_tasks, 1);
        assert_eq!(overview.overall_progress, 40.0);
    }

    #[tokio::test]
    async fn test_key_result_of_another_objective_is_not_found() {
        let service = service();
        let first = grow_revenue(&service).await;
        let first = service
            .add_key_result("Alice", first.id, deals_kr(4.0))
            .await
            .unwrap();
        let second = service
            .create_objective("Alice", NewObjective::new("Hire", "Alice", "Q3 2024"))
            .await
            .unwrap();
        let kr = first.key_results[0].clone();

        let err = service
            .update_key_result(
                "Alice",
                second.id,
                kr.id,
                KeyResultPatch {
                    current_value: Some(10.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let noted = service
            .add_note_to_key_result("Alice", second.id, kr.id, "wrong objective")
            .await
            .unwrap();
        assert!(noted.is_none());

        let first_after = service
            .get_objective_by_id("Alice", first.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first_after.key_results, vec![kr]);
        assert_eq!(first_after.overall_progress, 40.0);
        assert_eq!(first_after.version, first.version);

        let second_after = service
            .get_objective_by_id("Alice", second.id)
            .await
            .unwrap()
            .unwrap();
        assert!(second_after.key_results.is_empty());
    }

    #[tokio::test]
    async fn test_reads_agree_on_stored_metrics() {
        let service = service();
        let objective = grow_revenue(&service).await;
        let objective = service
            .add_key_result("Alice", objective.id, deals_kr(4.0))
            .await
            .unwrap();
        service
            .add_key_result("Alice", objective.id, deals_kr(10.0))
            .await
            .unwrap();

        let single = service
            .get_objective_by_id("Alice", objective.id)
            .await
            .unwrap()
            .unwrap();
        let listed = service.get_all_objectives("Alice", None).await.unwrap();
        assert_eq!(listed, vec![single.clone()]);
        assert_eq!(single.overall_progress, 70.0);
        assert_eq!(single.net_confidence_score, 70.0);
    }

    #[tokio::test]
    async fn test_responsible_may_update_own_key_result() {
        let store: Arc<dyn OkrStore> = Arc::new(MemoryStore::new());
        let editors = OkrService::new(store.clone(), Arc::new(AllowList::new(["Alice"])));
        let objective = grow_revenue(&editors).await;
        let objective = editors
            .add_key_result("Alice", objective.id, deals_kr(2.0))
            .await
            .unwrap();
        let kr_id = objective.key_results[0].id;

        let progress = KeyResultPatch {
            current_value: Some(8.0),
            confidence_level: Some(90),
            ..Default::default()
        };

        let err = editors
            .update_key_result("Mallory", objective.id, kr_id, progress.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let updated = editors
            .update_key_result("Bob", objective.id, kr_id, progress)
            .await
            .unwrap();
        assert_eq!(updated.overall_progress, 80.0);
        assert_eq!(updated.net_confidence_score, 90.0);

        let err = editors
            .remove_key_result("Bob", objective.id, kr_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_update_objective_keeps_identity() {
        let service = service();
        let objective = grow_revenue(&service).await;

        let updated = service
            .update_objective(
                "Alice",
                objective.id,
                ObjectivePatch {
                    title: Some("Grow Revenue 2x".into()),
                    quarter: Some("Q4 2024".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, objective.id);
        assert_eq!(updated.created_at, objective.created_at);
        assert_eq!(updated.title, "Grow Revenue 2x");
        assert_eq!(updated.version, objective.version + 1);

        let q3 = service.get_all_objectives("Alice", Some("Q3 2024")).await.unwrap();
        assert!(q3.is_empty());
        let q4 = service.get_all_objectives("Alice", Some("Q4 2024")).await.unwrap();
        assert_eq!(q4.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_objective() {
        let service = service();
        let objective = grow_revenue(&service).await;
        service
            .add_key_result("Alice", objective.id, deals_kr(3.0))
            .await
            .unwrap();

        assert!(service.delete_objective("Alice", objective.id).await.unwrap());
        assert!(service
            .get_objective_by_id("Alice", objective.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_overview() {
        let service = service();

        let empty = service
            .get_okr_overview_metrics("Alice", "Q1 2099")
            .await
            .unwrap();
        assert_eq!(empty.overall_progress, 0.0);
        assert_eq!(empty.net_confidence_score, 0.0);
        assert_eq!(empty.tasks_completed, 0);
        assert_eq!(empty.total_tasks, 0);
        assert!(empty.days_left > 0);

        let objective = service
            .create_objective("Alice", NewObjective::new("Grow", "Alice", "Q3 2024"))
            .await
            .unwrap();
        service
            .add_key_result("Alice", objective.id, deals_kr(10.0).with_status(KrStatus::Completed))
            .await
            .unwrap();
        service
            .add_key_result("Alice", objective.id, deals_kr(0.0))
            .await
            .unwrap();
        service
            .create_objective("Alice", NewObjective::new("Hire", "Alice", "Q3 2024"))
            .await
            .unwrap();

        let overview = service
            .get_okr_overview_metrics("Alice", "Q3 2024")
            .await
            .unwrap();
        assert_eq!(overview.total_tasks, 2);
        assert_eq!(overview.tasks_completed, 1);
        assert_eq!(overview.overall_progress, 25.0);
        assert_eq!(overview.net_confidence_score, 35.0);
        assert_eq!(overview.days_left, 0);
    }
}
