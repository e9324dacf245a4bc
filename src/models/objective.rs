use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::KeyResult;
use crate::metrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub responsible: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// `"Q<1-4> <year>"`, compared verbatim when filtering.
    pub quarter: String,
    #[serde(default)]
    pub key_results: Vec<KeyResult>,
    #[serde(default)]
    pub overall_progress: f64,
    #[serde(default)]
    pub net_confidence_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: i64,
}

impl Objective {
    pub fn new(id: Uuid, title: String, responsible: String, quarter: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description: None,
            responsible,
            owner_id: None,
            tags: Vec::new(),
            quarter,
            key_results: Vec::new(),
            overall_progress: 0.0,
            net_confidence_score: 0.0,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn key_result(&self, kr_id: Uuid) -> Option<&KeyResult> {
        self.key_results.iter().find(|kr| kr.id == kr_id)
    }

    pub fn add_key_result(&mut self, kr: KeyResult) {
        self.key_results.push(kr);
        self.calculate_metrics();
        self.touch();
    }

    /// Replaces the key result with the same id. Returns false, leaving the
    /// objective untouched, when no such key result exists.
    pub fn update_key_result(&mut self, kr: KeyResult) -> bool {
        match self.key_results.iter_mut().find(|existing| existing.id == kr.id) {
            Some(slot) => {
                *slot = kr;
                self.calculate_metrics();
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Drops the key result with `kr_id`. Unknown ids are a silent no-op.
    pub fn remove_key_result(&mut self, kr_id: Uuid) -> bool {
        let before = self.key_results.len();
        self.key_results.retain(|kr| kr.id != kr_id);
        if self.key_results.len() == before {
            return false;
        }
        self.calculate_metrics();
        self.touch();
        true
    }

    /// Rewrites `overall_progress` and `net_confidence_score` from the
    /// current key results. Touches nothing else.
    pub fn calculate_metrics(&mut self) {
        let aggregate = metrics::aggregate_key_results(&self.key_results);
        self.overall_progress = aggregate.overall_progress;
        self.net_confidence_score = aggregate.net_confidence_score;
    }

    pub fn completed_key_results(&self) -> usize {
        self.key_results.iter().filter(|kr| kr.is_completed()).count()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
