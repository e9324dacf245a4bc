//! Explicit command shapes for creating and patching OKR entities.
//!
//! Only the fields listed here can change through an update; identifiers,
//! ownership links and timestamps are not reachable.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{KeyResult, KrStatus, KrType, Objective};
use crate::error::{AppError, Result};

const MAX_CONFIDENCE: u8 = 100;

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(AppError::InvalidInput(format!(
            "{} must be a finite number",
            field
        )));
    }
    Ok(())
}

fn require_confidence(value: u8) -> Result<()> {
    if value > MAX_CONFIDENCE {
        return Err(AppError::InvalidInput(format!(
            "confidenceLevel must be between 0 and {}, got {}",
            MAX_CONFIDENCE, value
        )));
    }
    Ok(())
}

/// Tells an absent field (`None`) apart from an explicit `null`
/// (`Some(None)`), which clears the stored value.
fn clearable<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewObjective {
    pub title: String,
    pub responsible: String,
    pub quarter: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewObjective {
    pub fn new(
        title: impl Into<String>,
        responsible: impl Into<String>,
        quarter: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            responsible: responsible.into(),
            quarter: quarter.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("responsible", &self.responsible)?;
        require_text("quarter", &self.quarter)?;
        Ok(())
    }

    pub fn into_objective(self, id: Uuid) -> Objective {
        let mut objective = Objective::new(id, self.title, self.responsible, self.quarter);
        objective.description = self.description;
        objective.owner_id = self.owner_id;
        objective.tags = self.tags;
        objective
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectivePatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    pub responsible: Option<String>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub quarter: Option<String>,
}

impl ObjectivePatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(responsible) = &self.responsible {
            require_text("responsible", responsible)?;
        }
        if let Some(quarter) = &self.quarter {
            require_text("quarter", quarter)?;
        }
        Ok(())
    }

    pub fn apply_to(self, objective: &mut Objective) {
        if let Some(title) = self.title {
            objective.title = title;
        }
        if let Some(description) = self.description {
            objective.description = description;
        }
        if let Some(responsible) = self.responsible {
            objective.responsible = responsible;
        }
        if let Some(owner_id) = self.owner_id {
            objective.owner_id = owner_id;
        }
        if let Some(tags) = self.tags {
            objective.tags = tags;
        }
        if let Some(quarter) = self.quarter {
            objective.quarter = quarter;
        }
        objective.touch();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKeyResult {
    pub title: String,
    pub responsible: String,
    #[serde(rename = "type")]
    pub kr_type: KrType,
    pub target_value: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub confidence_level: u8,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub status: Option<KrStatus>,
    #[serde(default)]
    pub current_value: Option<f64>,
}

impl NewKeyResult {
    pub fn new(
        title: impl Into<String>,
        responsible: impl Into<String>,
        kr_type: KrType,
        target_value: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        confidence_level: u8,
    ) -> Self {
        Self {
            title: title.into(),
            responsible: responsible.into(),
            kr_type,
            target_value,
            start_date,
            end_date,
            confidence_level,
            description: None,
            unit: None,
            status: None,
            current_value: None,
        }
    }

    pub fn with_current_value(mut self, current_value: f64) -> Self {
        self.current_value = Some(current_value);
        self
    }

    pub fn with_status(mut self, status: KrStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("responsible", &self.responsible)?;
        require_finite("targetValue", self.target_value)?;
        if let Some(current_value) = self.current_value {
            require_finite("currentValue", current_value)?;
        }
        require_confidence(self.confidence_level)?;
        Ok(())
    }

    pub fn into_key_result(self, id: Uuid, objective_id: Uuid) -> KeyResult {
        KeyResult {
            id,
            objective_id,
            title: self.title,
            description: self.description,
            responsible: self.responsible,
            kr_type: self.kr_type,
            target_value: self.target_value,
            current_value: self.current_value.unwrap_or(0.0),
            unit: self.unit,
            status: self.status.unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
            confidence_level: self.confidence_level,
            notes: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResultPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    pub responsible: Option<String>,
    #[serde(rename = "type")]
    pub kr_type: Option<KrType>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    pub unit: Option<Option<String>>,
    pub status: Option<KrStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub confidence_level: Option<u8>,
}

impl KeyResultPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(responsible) = &self.responsible {
            require_text("responsible", responsible)?;
        }
        if let Some(target_value) = self.target_value {
            require_finite("targetValue", target_value)?;
        }
        if let Some(current_value) = self.current_value {
            require_finite("currentValue", current_value)?;
        }
        if let Some(confidence_level) = self.confidence_level {
            require_confidence(confidence_level)?;
        }
        Ok(())
    }

    /// Applies the patch. `last_updated` is refreshed even for an empty patch.
    pub fn apply_to(self, kr: &mut KeyResult) {
        if let Some(title) = self.title {
            kr.title = title;
        }
        if let Some(description) = self.description {
            kr.description = description;
        }
        if let Some(responsible) = self.responsible {
            kr.responsible = responsible;
        }
        if let Some(kr_type) = self.kr_type {
            kr.kr_type = kr_type;
        }
        if let Some(target_value) = self.target_value {
            kr.target_value = target_value;
        }
        if let Some(unit) = self.unit {
            kr.unit = unit;
        }
        if let Some(start_date) = self.start_date {
            kr.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            kr.end_date = end_date;
        }

        match self.current_value {
            Some(current_value) => {
                kr.update_progress(current_value, self.status, self.confidence_level)
            }
            None => {
                if let Some(status) = self.status {
                    kr.status = status;
                }
                if let Some(confidence_level) = self.confidence_level {
                    kr.confidence_level = confidence_level;
                }
                kr.touch();
            }
        }
    }
}
