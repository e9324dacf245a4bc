use serde::{Deserialize, Serialize};

/// Company-level rollup for one quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkrOverviewMetrics {
    pub days_left: i64,
    pub overall_progress: f64,
    pub tasks_completed: usize,
    pub total_tasks: usize,
    pub net_confidence_score: f64,
}
