use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{PermissionConfig, PermissionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OkrAction {
    CreateObjective,
    GetObjective,
    GetAllObjectives,
    UpdateObjective,
    DeleteObjective,
    AddKeyResult,
    UpdateKeyResult,
    RemoveKeyResult,
    AddNoteToKeyResult,
    GetOkrOverview,
}

impl OkrAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OkrAction::CreateObjective => "createObjective",
            OkrAction::GetObjective => "getObjective",
            OkrAction::GetAllObjectives => "getAllObjectives",
            OkrAction::UpdateObjective => "updateObjective",
            OkrAction::DeleteObjective => "deleteObjective",
            OkrAction::AddKeyResult => "addKeyResult",
            OkrAction::UpdateKeyResult => "updateKeyResult",
            OkrAction::RemoveKeyResult => "removeKeyResult",
            OkrAction::AddNoteToKeyResult => "addNoteToKeyResult",
            OkrAction::GetOkrOverview => "getOkrOverview",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            OkrAction::GetObjective | OkrAction::GetAllObjectives | OkrAction::GetOkrOverview
        )
    }
}

impl fmt::Display for OkrAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether an actor may perform an action, optionally on a specific
/// objective.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn authorize(&self, user_id: &str, action: OkrAction, resource_id: Option<Uuid>) -> bool;
}

/// Authorizes everything. The default until a real policy is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PermissionGate for AllowAll {
    async fn authorize(&self, user_id: &str, action: OkrAction, resource_id: Option<Uuid>) -> bool {
        tracing::debug!(
            "Checking permission for user {} to {} on resource {}",
            user_id,
            action,
            resource_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "general".to_string())
        );
        true
    }
}

/// Reads are open to everyone; mutations only to listed editors.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    editors: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(editors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            editors: editors.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl PermissionGate for AllowList {
    async fn authorize(&self, user_id: &str, action: OkrAction, _resource_id: Option<Uuid>) -> bool {
        let allowed = action.is_read() || self.editors.contains(user_id);
        if !allowed {
            tracing::debug!("User {} is not an editor, refusing {}", user_id, action);
        }
        allowed
    }
}

pub fn gate_from_config(config: &PermissionConfig) -> Arc<dyn PermissionGate> {
    match config.mode {
        PermissionMode::AllowAll => Arc::new(AllowAll),
        PermissionMode::AllowList => Arc::new(AllowList::new(config.editors.iter().cloned())),
    }
}
