use chrono::{NaiveDate, Utc};
use okrtracker_lib::database::{OkrStore, SqliteDatabase};
use okrtracker_lib::metrics;
use okrtracker_lib::models::{KeyResultPatch, KrStatus, KrType, NewKeyResult, NewObjective};
use okrtracker_lib::permissions::AllowAll;
use okrtracker_lib::{AppError, OkrService};
use std::sync::Arc;

async fn sqlite_service() -> OkrService {
    let store: Arc<dyn OkrStore> = Arc::new(SqliteDatabase::in_memory().await.unwrap());
    OkrService::new(store, Arc::new(AllowAll))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn grow_revenue_scenario() {
    let service = sqlite_service().await;

    let objective = service
        .create_objective("Alice", NewObjective::new("Grow Revenue", "Alice", "Q3 2024"))
        .await
        .unwrap();

    let kr = NewKeyResult::new(
        "Sign 10 deals",
        "Bob",
        KrType::Number,
        10.0,
        date(2024, 7, 1),
        date(2024, 9, 30),
        70,
    )
    .with_current_value(4.0);
    let objective = service
        .add_key_result("Alice", objective.id, kr)
        .await
        .unwrap();
    assert_eq!(objective.overall_progress, 40.0);
    assert_eq!(objective.net_confidence_score, 70.0);

    let kr_id = objective.key_results[0].id;
    let objective = service
        .update_key_result(
            "Bob",
            objective.id,
            kr_id,
            KeyResultPatch {
                current_value: Some(10.0),
                status: Some(KrStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(objective.overall_progress, 100.0);

    let note = service
        .add_note_to_key_result("Bob", objective.id, kr_id, "all deals signed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(note.notes, vec!["all deals signed"]);

    let overview = service
        .get_okr_overview_metrics("Alice", "Q3 2024")
        .await
        .unwrap();
    assert_eq!(overview.tasks_completed, 1);
    assert_eq!(overview.total_tasks, 1);
    assert_eq!(overview.overall_progress, 100.0);
    assert_eq!(overview.net_confidence_score, 70.0);

    assert!(service.delete_objective("Alice", objective.id).await.unwrap());
    let err = service
        .add_key_result(
            "Alice",
            objective.id,
            NewKeyResult::new(
                "Late",
                "Bob",
                KrType::Boolean,
                1.0,
                date(2024, 7, 1),
                date(2024, 9, 30),
                10,
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn empty_future_quarter_overview() {
    let service = sqlite_service().await;

    let overview = service
        .get_okr_overview_metrics("Alice", "Q1 2099")
        .await
        .unwrap();
    assert_eq!(overview.overall_progress, 0.0);
    assert_eq!(overview.net_confidence_score, 0.0);
    assert_eq!(overview.tasks_completed, 0);
    assert_eq!(overview.total_tasks, 0);

    let expected = metrics::days_left("Q1 2099", Utc::now());
    assert!((overview.days_left - expected).abs() <= 1);
    assert!(overview.days_left > 0);
}

#[tokio::test]
async fn key_result_changes_round_trip_through_sqlite() {
    let service = sqlite_service().await;
    let objective = service
        .create_objective("Alice", NewObjective::new("Launch", "Alice", "Q4 2024"))
        .await
        .unwrap();

    let objective = service
        .add_key_result(
            "Alice",
            objective.id,
            NewKeyResult::new(
                "Reach 5k MRR",
                "Carol",
                KrType::Currency,
                5000.0,
                date(2024, 10, 1),
                date(2024, 12, 31),
                40,
            )
            .with_current_value(1250.0)
            .with_unit("USD"),
        )
        .await
        .unwrap();
    let objective = service
        .add_key_result(
            "Alice",
            objective.id,
            NewKeyResult::new(
                "Beta shipped",
                "Dan",
                KrType::Boolean,
                1.0,
                date(2024, 10, 1),
                date(2024, 12, 31),
                80,
            ),
        )
        .await
        .unwrap();
    assert_eq!(objective.overall_progress, 12.5);
    assert_eq!(objective.net_confidence_score, 60.0);

    let stored = service
        .get_objective_by_id("Alice", objective.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.key_results.len(), 2);
    assert_eq!(stored.key_results[0].title, "Reach 5k MRR");
    assert_eq!(stored.key_results[0].unit.as_deref(), Some("USD"));
    assert_eq!(stored.key_results[1].kr_type, KrType::Boolean);
    assert_eq!(stored.version, 2);

    let first = stored.key_results[0].id;
    let after = service
        .remove_key_result("Alice", objective.id, first)
        .await
        .unwrap();
    assert_eq!(after.key_results.len(), 1);
    assert_eq!(after.overall_progress, 0.0);
    assert_eq!(after.net_confidence_score, 80.0);

    let listed = service
        .get_all_objectives("Alice", Some("Q4 2024"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key_results.len(), 1);
}
