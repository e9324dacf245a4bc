use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::Value;
use uuid::Uuid;

use super::{set_or_clear, Actor};
use crate::error::Result;
use crate::models::{KeyResultPatch, KrStatus, KrType, NewKeyResult};
use crate::okr::OkrService;

#[derive(Debug, Subcommand)]
pub enum KeyResultCommand {
    Add {
        #[command(flatten)]
        actor: Actor,
        objective_id: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        responsible: String,
        /// boolean, percentage, currency or number
        #[arg(long = "type")]
        kr_type: KrType,
        #[arg(long, allow_negative_numbers = true)]
        target: f64,
        /// YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        /// 0 to 100
        #[arg(long)]
        confidence: u8,
        #[arg(long, allow_negative_numbers = true)]
        current: Option<f64>,
        #[arg(long)]
        status: Option<KrStatus>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        #[command(flatten)]
        actor: Actor,
        objective_id: Uuid,
        kr_id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
        #[arg(long)]
        responsible: Option<String>,
        #[arg(long = "type")]
        kr_type: Option<KrType>,
        #[arg(long, allow_negative_numbers = true)]
        target: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        current: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long, conflicts_with = "unit")]
        clear_unit: bool,
        #[arg(long)]
        status: Option<KrStatus>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        confidence: Option<u8>,
    },
    Remove {
        #[command(flatten)]
        actor: Actor,
        objective_id: Uuid,
        kr_id: Uuid,
    },
    Note {
        #[command(flatten)]
        actor: Actor,
        objective_id: Uuid,
        kr_id: Uuid,
        note: String,
    },
}

impl KeyResultCommand {
    pub async fn execute(self, service: &OkrService) -> Result<Value> {
        match self {
            KeyResultCommand::Add {
                actor,
                objective_id,
                title,
                responsible,
                kr_type,
                target,
                start,
                end,
                confidence,
                current,
                status,
                unit,
                description,
            } => {
                let data = NewKeyResult {
                    description,
                    unit,
                    status,
                    current_value: current,
                    ..NewKeyResult::new(title, responsible, kr_type, target, start, end, confidence)
                };
                let objective = service
                    .add_key_result(&actor.user_id, objective_id, data)
                    .await?;
                Ok(serde_json::to_value(objective)?)
            }
            KeyResultCommand::Update {
                actor,
                objective_id,
                kr_id,
                title,
                description,
                clear_description,
                responsible,
                kr_type,
                target,
                current,
                unit,
                clear_unit,
                status,
                start,
                end,
                confidence,
            } => {
                let patch = KeyResultPatch {
                    title,
                    description: set_or_clear(description, clear_description),
                    responsible,
                    kr_type,
                    target_value: target,
                    current_value: current,
                    unit: set_or_clear(unit, clear_unit),
                    status,
                    start_date: start,
                    end_date: end,
                    confidence_level: confidence,
                };
                let objective = service
                    .update_key_result(&actor.user_id, objective_id, kr_id, patch)
                    .await?;
                Ok(serde_json::to_value(objective)?)
            }
            KeyResultCommand::Remove {
                actor,
                objective_id,
                kr_id,
            } => {
                let objective = service
                    .remove_key_result(&actor.user_id, objective_id, kr_id)
                    .await?;
                Ok(serde_json::to_value(objective)?)
            }
            KeyResultCommand::Note {
                actor,
                objective_id,
                kr_id,
                note,
            } => {
                let kr = service
                    .add_note_to_key_result(&actor.user_id, objective_id, kr_id, &note)
                    .await?;
                Ok(serde_json::to_value(kr)?)
            }
        }
    }
}
