//! Pure progress and rollup calculations shared by the models and the
//! service layer.

pub mod quarter;

pub use quarter::Quarter;

use chrono::{DateTime, Utc};

use crate::models::{KeyResult, Objective, OkrOverviewMetrics};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KeyResultAggregate {
    pub overall_progress: f64,
    pub net_confidence_score: f64,
}

pub fn key_result_progress(kr: &KeyResult) -> f64 {
    kr.progress()
}

/// Unweighted means of progress and confidence. Both are 0 for an empty set.
pub fn aggregate_key_results(key_results: &[KeyResult]) -> KeyResultAggregate {
    if key_results.is_empty() {
        return KeyResultAggregate::default();
    }

    let count = key_results.len() as f64;
    let total_progress: f64 = key_results.iter().map(key_result_progress).sum();
    let total_confidence: f64 = key_results
        .iter()
        .map(|kr| f64::from(kr.confidence_level))
        .sum();

    KeyResultAggregate {
        overall_progress: total_progress / count,
        net_confidence_score: total_confidence / count,
    }
}

/// Whole days until the quarter's last day, rounded up. 0 once the quarter
/// has passed or when `quarter` is not a `Q<n> <year>` label.
pub fn days_left(quarter: &str, now: DateTime<Utc>) -> i64 {
    let end = match quarter.parse::<Quarter>().ok().and_then(|q| q.end_instant()) {
        Some(end) => end,
        None => return 0,
    };

    if now > end {
        return 0;
    }

    let remaining = (end - now).num_milliseconds();
    (remaining + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Rolls up every objective of one quarter. Callers pass objectives that
/// already belong to `quarter`.
pub fn overview(objectives: &[Objective], quarter: &str, now: DateTime<Utc>) -> OkrOverviewMetrics {
    let days_left = days_left(quarter, now);

    if objectives.is_empty() {
        return OkrOverviewMetrics {
            days_left,
            overall_progress: 0.0,
            tasks_completed: 0,
            total_tasks: 0,
            net_confidence_score: 0.0,
        };
    }

    let count = objectives.len() as f64;
    let overall_progress = objectives.iter().map(|o| o.overall_progress).sum::<f64>() / count;
    let net_confidence_score =
        objectives.iter().map(|o| o.net_confidence_score).sum::<f64>() / count;
    let tasks_completed = objectives.iter().map(Objective::completed_key_results).sum();
    let total_tasks = objectives.iter().map(|o| o.key_results.len()).sum();

    OkrOverviewMetrics {
        days_left,
        overall_progress,
        tasks_completed,
        total_tasks,
        net_confidence_score,
    }
}
