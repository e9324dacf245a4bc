use crate::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::Objective;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use super::{operations, OkrStore};

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = config.connection_url()?;
        Self::connect(&url, config.max_connections).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;

        Ok(db)
    }

    /// Private in-memory database. One connection that never idles out, so
    /// the schema lives as long as the pool.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;

        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS objectives (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                responsible TEXT NOT NULL,
                owner_id TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                quarter TEXT NOT NULL,
                overall_progress REAL NOT NULL DEFAULT 0,
                net_confidence_score REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create objectives table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_results (
                id TEXT PRIMARY KEY NOT NULL,
                objective_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                responsible TEXT NOT NULL,
                kr_type TEXT NOT NULL,
                target_value REAL NOT NULL,
                current_value REAL NOT NULL DEFAULT 0,
                unit TEXT,
                status TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                confidence_level INTEGER NOT NULL,
                notes TEXT NOT NULL DEFAULT '[]',
                last_updated TEXT NOT NULL,
                FOREIGN KEY (objective_id) REFERENCES objectives(id) ON DELETE CASCADE
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create key_results table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_key_results_objective_id ON key_results(objective_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to create key_results objective_id index: {}", e))
        })?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_objectives_quarter ON objectives(quarter)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create quarter index: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl OkrStore for SqliteDatabase {
    async fn insert_objective(&self, objective: &Objective) -> Result<()> {
        operations::objectives::insert_objective(&self.pool, objective).await
    }

    async fn find_objective(&self, id: Uuid) -> Result<Option<Objective>> {
        operations::objectives::find_objective(&self.pool, id).await
    }

    async fn list_objectives(&self, quarter: Option<&str>) -> Result<Vec<Objective>> {
        operations::objectives::list_objectives(&self.pool, quarter).await
    }

    async fn save_objective(&self, objective: &Objective) -> Result<()> {
        operations::objectives::save_objective(&self.pool, objective).await
    }

    async fn delete_objective(&self, id: Uuid) -> Result<bool> {
        operations::objectives::delete_objective(&self.pool, id).await
    }
}
