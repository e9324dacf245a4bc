use crate::error::{AppError, Result};
use crate::models::Objective;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::key_results;

const OBJECTIVE_COLUMNS: &str = "id, title, description, responsible, owner_id, tags, quarter, \
     overall_progress, net_confidence_score, created_at, updated_at, version";

pub async fn insert_objective(pool: &SqlitePool, objective: &Objective) -> Result<()> {
    let tags_json = serde_json::to_string(&objective.tags)
        .map_err(|e| AppError::Database(format!("Failed to serialize tags: {}", e)))?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO objectives (id, title, description, responsible, owner_id, tags, quarter,
                                overall_progress, net_confidence_score, created_at, updated_at,
                                version)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    "#,
    )
    .bind(objective.id.to_string())
    .bind(&objective.title)
    .bind(&objective.description)
    .bind(&objective.responsible)
    .bind(&objective.owner_id)
    .bind(tags_json)
    .bind(&objective.quarter)
    .bind(objective.overall_progress)
    .bind(objective.net_confidence_score)
    .bind(objective.created_at.to_rfc3339())
    .bind(objective.updated_at.to_rfc3339())
    .bind(objective.version)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Database(format!("Failed to insert objective: {}", e)))?;

    key_results::replace_for_objective(&mut tx, objective).await?;

    tx.commit().await?;
    Ok(())
}

/// The objective row and its key results are read in one transaction so the
/// stored aggregates always match the embedded key results.
pub async fn find_objective(pool: &SqlitePool, id: Uuid) -> Result<Option<Objective>> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!(
        "SELECT {} FROM objectives WHERE id = ?",
        OBJECTIVE_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::Database(format!("Failed to fetch objective: {}", e)))?;

    let mut objective = match row {
        Some(row) => objective_from_row(&row)?,
        None => return Ok(None),
    };
    objective.key_results = key_results::load_for_objective(&mut tx, id).await?;

    tx.commit().await?;
    Ok(Some(objective))
}

pub async fn list_objectives(pool: &SqlitePool, quarter: Option<&str>) -> Result<Vec<Objective>> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM objectives WHERE (?1 IS NULL OR quarter = ?1) ORDER BY created_at DESC",
        OBJECTIVE_COLUMNS
    ))
    .bind(quarter)
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| AppError::Database(format!("Failed to fetch objectives: {}", e)))?;

    let mut grouped = key_results::load_grouped(&mut tx, quarter).await?;
    tx.commit().await?;

    let mut objectives = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut objective = objective_from_row(row)?;
        objective.key_results = grouped.remove(&objective.id).unwrap_or_default();
        objectives.push(objective);
    }

    Ok(objectives)
}

/// Writes the objective row and its whole key result set in one
/// transaction, provided nobody saved a newer version in between.
pub async fn save_objective(pool: &SqlitePool, objective: &Objective) -> Result<()> {
    let tags_json = serde_json::to_string(&objective.tags)
        .map_err(|e| AppError::Database(format!("Failed to serialize tags: {}", e)))?;

    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE objectives SET
            title = ?1,
            description = ?2,
            responsible = ?3,
            owner_id = ?4,
            tags = ?5,
            quarter = ?6,
            overall_progress = ?7,
            net_confidence_score = ?8,
            updated_at = ?9,
            version = version + 1
        WHERE id = ?10 AND version = ?11
    "#,
    )
    .bind(&objective.title)
    .bind(&objective.description)
    .bind(&objective.responsible)
    .bind(&objective.owner_id)
    .bind(tags_json)
    .bind(&objective.quarter)
    .bind(objective.overall_progress)
    .bind(objective.net_confidence_score)
    .bind(objective.updated_at.to_rfc3339())
    .bind(objective.id.to_string())
    .bind(objective.version)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::Database(format!("Failed to update objective: {}", e)))?;

    if updated.rows_affected() == 0 {
        let current: Option<i64> = sqlx::query_scalar("SELECT version FROM objectives WHERE id = ?")
            .bind(objective.id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::Database(format!("Failed to fetch objective version: {}", e)))?;

        return Err(match current {
            Some(version) => AppError::Conflict(format!(
                "Objective {} was modified concurrently (expected version {}, found {})",
                objective.id, objective.version, version
            )),
            None => AppError::NotFound(format!("Objective {}", objective.id)),
        });
    }

    key_results::replace_for_objective(&mut tx, objective).await?;

    tx.commit().await?;
    Ok(())
}

pub async fn delete_objective(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM key_results WHERE objective_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete key results: {}", e)))?;

    let deleted = sqlx::query("DELETE FROM objectives WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete objective: {}", e)))?;

    tx.commit().await?;
    Ok(deleted.rows_affected() > 0)
}

fn objective_from_row(row: &SqliteRow) -> Result<Objective> {
    let tags: Vec<String> = serde_json::from_str(&row.get::<String, _>("tags"))
        .map_err(|e| AppError::Database(format!("Failed to parse tags: {}", e)))?;

    Ok(Objective {
        id: Uuid::parse_str(&row.get::<String, _>("id"))
            .map_err(|e| AppError::Database(format!("Invalid UUID: {}", e)))?,
        title: row.get("title"),
        description: row.get("description"),
        responsible: row.get("responsible"),
        owner_id: row.get("owner_id"),
        tags,
        quarter: row.get("quarter"),
        key_results: Vec::new(),
        overall_progress: row.get("overall_progress"),
        net_confidence_score: row.get("net_confidence_score"),
        created_at: DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
            .map_err(|e| AppError::Database(format!("Invalid created_at date: {}", e)))?
            .with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&row.get::<String, _>("updated_at"))
            .map_err(|e| AppError::Database(format!("Invalid updated_at date: {}", e)))?
            .with_timezone(&Utc),
        version: row.get("version"),
    })
}
