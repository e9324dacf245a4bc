use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// How a key result turns its current value into a progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KrType {
    Boolean,
    Percentage,
    Currency,
    Number,
}

impl KrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KrType::Boolean => "boolean",
            KrType::Percentage => "percentage",
            KrType::Currency => "currency",
            KrType::Number => "number",
        }
    }
}

impl fmt::Display for KrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KrType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "boolean" => Ok(KrType::Boolean),
            "percentage" => Ok(KrType::Percentage),
            "currency" => Ok(KrType::Currency),
            "number" => Ok(KrType::Number),
            other => Err(AppError::InvalidInput(format!(
                "Unknown key result type '{}'",
                other
            ))),
        }
    }
}

/// Caller-managed lifecycle label. Never derived from progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KrStatus {
    #[default]
    Planned,
    InProgress,
    AtRisk,
    Completed,
}

impl KrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KrStatus::Planned => "planned",
            KrStatus::InProgress => "in_progress",
            KrStatus::AtRisk => "at_risk",
            KrStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for KrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KrStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "planned" => Ok(KrStatus::Planned),
            "in_progress" => Ok(KrStatus::InProgress),
            "at_risk" => Ok(KrStatus::AtRisk),
            "completed" => Ok(KrStatus::Completed),
            other => Err(AppError::InvalidInput(format!(
                "Unknown key result status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResult {
    pub id: Uuid,
    pub objective_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub responsible: String,
    #[serde(rename = "type")]
    pub kr_type: KrType,
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub status: KrStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub confidence_level: u8,
    #[serde(default)]
    pub notes: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl KeyResult {
    /// Progress as a percentage in `[0, 100]`.
    ///
    /// A zero target counts as met as soon as anything is recorded. Boolean
    /// results are all-or-nothing; every other type is the clamped ratio.
    pub fn progress(&self) -> f64 {
        if self.target_value == 0.0 {
            return if self.current_value > 0.0 { 100.0 } else { 0.0 };
        }

        match self.kr_type {
            KrType::Boolean => {
                if self.current_value >= self.target_value {
                    100.0
                } else {
                    0.0
                }
            }
            _ => ((self.current_value / self.target_value) * 100.0).clamp(0.0, 100.0),
        }
    }

    /// Sets the measured value. Status and confidence are only overwritten
    /// when given.
    pub fn update_progress(
        &mut self,
        current_value: f64,
        status: Option<KrStatus>,
        confidence_level: Option<u8>,
    ) {
        self.current_value = current_value;
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(confidence_level) = confidence_level {
            self.confidence_level = confidence_level;
        }
        self.touch();
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
        self.touch();
    }

    pub fn is_completed(&self) -> bool {
        self.status == KrStatus::Completed
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
