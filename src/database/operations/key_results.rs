use crate::error::{AppError, Result};
use crate::models::{KeyResult, Objective};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

const KEY_RESULT_COLUMNS: &str = "id, objective_id, title, description, responsible, kr_type, \
     target_value, current_value, unit, status, start_date, end_date, confidence_level, notes, \
     last_updated";

pub async fn insert_key_result(
    conn: &mut SqliteConnection,
    kr: &KeyResult,
    position: usize,
) -> Result<()> {
    let notes_json = serde_json::to_string(&kr.notes)
        .map_err(|e| AppError::Database(format!("Failed to serialize notes: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO key_results (id, objective_id, position, title, description, responsible,
                                 kr_type, target_value, current_value, unit, status,
                                 start_date, end_date, confidence_level, notes, last_updated)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
    "#,
    )
    .bind(kr.id.to_string())
    .bind(kr.objective_id.to_string())
    .bind(position as i64)
    .bind(&kr.title)
    .bind(&kr.description)
    .bind(&kr.responsible)
    .bind(kr.kr_type.as_str())
    .bind(kr.target_value)
    .bind(kr.current_value)
    .bind(&kr.unit)
    .bind(kr.status.as_str())
    .bind(kr.start_date.format(DATE_FORMAT).to_string())
    .bind(kr.end_date.format(DATE_FORMAT).to_string())
    .bind(i64::from(kr.confidence_level))
    .bind(notes_json)
    .bind(kr.last_updated.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("Failed to insert key result: {}", e)))?;

    Ok(())
}

/// Rewrites the stored key result set of `objective` to match memory,
/// preserving order. Runs on the caller's transaction.
pub async fn replace_for_objective(conn: &mut SqliteConnection, objective: &Objective) -> Result<()> {
    sqlx::query("DELETE FROM key_results WHERE objective_id = ?")
        .bind(objective.id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to clear key results: {}", e)))?;

    for (position, kr) in objective.key_results.iter().enumerate() {
        insert_key_result(conn, kr, position).await?;
    }

    Ok(())
}

pub async fn load_for_objective(
    conn: &mut SqliteConnection,
    objective_id: Uuid,
) -> Result<Vec<KeyResult>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM key_results WHERE objective_id = ? ORDER BY position",
        KEY_RESULT_COLUMNS
    ))
    .bind(objective_id.to_string())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("Failed to fetch key results: {}", e)))?;

    rows.iter().map(key_result_from_row).collect()
}

/// Key results of every objective in `quarter` (or all objectives), grouped
/// by owner.
pub async fn load_grouped(
    conn: &mut SqliteConnection,
    quarter: Option<&str>,
) -> Result<HashMap<Uuid, Vec<KeyResult>>> {
    let rows = sqlx::query(
        r#"
        SELECT kr.id, kr.objective_id, kr.title, kr.description, kr.responsible, kr.kr_type,
               kr.target_value, kr.current_value, kr.unit, kr.status, kr.start_date,
               kr.end_date, kr.confidence_level, kr.notes, kr.last_updated
        FROM key_results kr
        JOIN objectives o ON o.id = kr.objective_id
        WHERE (?1 IS NULL OR o.quarter = ?1)
        ORDER BY kr.objective_id, kr.position
    "#,
    )
    .bind(quarter)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::Database(format!("Failed to fetch key results: {}", e)))?;

    let mut grouped: HashMap<Uuid, Vec<KeyResult>> = HashMap::new();
    for row in &rows {
        let kr = key_result_from_row(row)?;
        grouped.entry(kr.objective_id).or_default().push(kr);
    }

    Ok(grouped)
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| AppError::Database(format!("Invalid {} date: {}", field, e)))
}

fn key_result_from_row(row: &SqliteRow) -> Result<KeyResult> {
    let notes: Vec<String> = serde_json::from_str(&row.get::<String, _>("notes"))
        .map_err(|e| AppError::Database(format!("Failed to parse notes: {}", e)))?;

    let confidence_level = u8::try_from(row.get::<i64, _>("confidence_level"))
        .map_err(|e| AppError::Database(format!("Invalid confidence level: {}", e)))?;

    Ok(KeyResult {
        id: Uuid::parse_str(&row.get::<String, _>("id"))
            .map_err(|e| AppError::Database(format!("Invalid UUID: {}", e)))?,
        objective_id: Uuid::parse_str(&row.get::<String, _>("objective_id"))
            .map_err(|e| AppError::Database(format!("Invalid objective UUID: {}", e)))?,
        title: row.get("title"),
        description: row.get("description"),
        responsible: row.get("responsible"),
        kr_type: row.get::<String, _>("kr_type").parse()?,
        target_value: row.get("target_value"),
        current_value: row.get("current_value"),
        unit: row.get("unit"),
        status: row.get::<String, _>("status").parse()?,
        start_date: parse_date("start", &row.get::<String, _>("start_date"))?,
        end_date: parse_date("end", &row.get::<String, _>("end_date"))?,
        confidence_level,
        notes,
        last_updated: DateTime::parse_from_rfc3339(&row.get::<String, _>("last_updated"))
            .map_err(|e| AppError::Database(format!("Invalid last_updated date: {}", e)))?
            .with_timezone(&Utc),
    })
}
