use chrono::Utc;
use clap::Args;
use serde_json::Value;

use super::Actor;
use crate::error::Result;
use crate::metrics::Quarter;
use crate::okr::OkrService;

#[derive(Debug, Args)]
pub struct OverviewArgs {
    #[command(flatten)]
    pub actor: Actor,
    /// Defaults to the current quarter
    #[arg(long)]
    pub quarter: Option<String>,
}

impl OverviewArgs {
    pub async fn execute(self, service: &OkrService) -> Result<Value> {
        let quarter = self
            .quarter
            .unwrap_or_else(|| Quarter::containing(Utc::now().date_naive()).to_string());

        let overview = service
            .get_okr_overview_metrics(&self.actor.user_id, &quarter)
            .await?;
        Ok(serde_json::json!({
            "quarter": quarter,
            "metrics": serde_json::to_value(overview)?,
        }))
    }
}
