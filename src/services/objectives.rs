use clap::Subcommand;
use serde_json::Value;
use uuid::Uuid;

use super::{set_or_clear, Actor};
use crate::error::Result;
use crate::models::{NewObjective, ObjectivePatch};
use crate::okr::OkrService;

#[derive(Debug, Subcommand)]
pub enum ObjectiveCommand {
    Create {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        title: String,
        #[arg(long)]
        responsible: String,
        /// Quarter label, e.g. "Q3 2024"
        #[arg(long)]
        quarter: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        owner_id: Option<String>,
        /// Repeat for several tags
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Get {
        #[command(flatten)]
        actor: Actor,
        id: Uuid,
    },
    List {
        #[command(flatten)]
        actor: Actor,
        /// Only objectives whose quarter matches exactly
        #[arg(long)]
        quarter: Option<String>,
    },
    Update {
        #[command(flatten)]
        actor: Actor,
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
        #[arg(long)]
        responsible: Option<String>,
        #[arg(long)]
        owner_id: Option<String>,
        #[arg(long, conflicts_with = "owner_id")]
        clear_owner_id: bool,
        /// Replaces all tags; repeat for several
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        quarter: Option<String>,
    },
    Delete {
        #[command(flatten)]
        actor: Actor,
        id: Uuid,
    },
}

impl ObjectiveCommand {
    pub async fn execute(self, service: &OkrService) -> Result<Value> {
        match self {
            ObjectiveCommand::Create {
                actor,
                title,
                responsible,
                quarter,
                description,
                owner_id,
                tags,
            } => {
                let data = NewObjective {
                    description,
                    owner_id,
                    tags,
                    ..NewObjective::new(title, responsible, quarter)
                };
                let objective = service.create_objective(&actor.user_id, data).await?;
                Ok(serde_json::to_value(objective)?)
            }
            ObjectiveCommand::Get { actor, id } => {
                let objective = service.get_objective_by_id(&actor.user_id, id).await?;
                Ok(serde_json::to_value(objective)?)
            }
            ObjectiveCommand::List { actor, quarter } => {
                let objectives = service
                    .get_all_objectives(&actor.user_id, quarter.as_deref())
                    .await?;
                Ok(serde_json::to_value(objectives)?)
            }
            ObjectiveCommand::Update {
                actor,
                id,
                title,
                description,
                clear_description,
                responsible,
                owner_id,
                clear_owner_id,
                tags,
                quarter,
            } => {
                let patch = ObjectivePatch {
                    title,
                    description: set_or_clear(description, clear_description),
                    responsible,
                    owner_id: set_or_clear(owner_id, clear_owner_id),
                    tags: if tags.is_empty() { None } else { Some(tags) },
                    quarter,
                };
                let objective = service.update_objective(&actor.user_id, id, patch).await?;
                Ok(serde_json::to_value(objective)?)
            }
            ObjectiveCommand::Delete { actor, id } => {
                if service.delete_objective(&actor.user_id, id).await? {
                    Ok(serde_json::json!({ "deleted": id }))
                } else {
                    Ok(Value::Null)
                }
            }
        }
    }
}
