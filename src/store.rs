use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::DatabaseConfig;
use crate::models::{CheckOutcome, PricePoint, TrackedItem};
use crate::utils::error::AppError;
use crate::Result;

/// Durable store of tracked items and their price history, backed by SQLite.
/// Every mutation commits independently; nothing spans items or poll cycles.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        // Ensure the parent directory exists for file-backed databases.
        if let Some(path) = config.url.strip_prefix("sqlite:") {
            if !path.starts_with(':') {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Returns the existing item for (user_id, url), or inserts an empty one.
    pub async fn upsert(&self, user_id: i64, url: &str) -> Result<TrackedItem> {
        let item = TrackedItem::new(user_id, url);
        sqlx::query(
            r#"
            INSERT INTO tracked_items
                (id, user_id, url, title, current_price, target_price,
                 last_checked_at, last_error, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, url) DO NOTHING
            "#,
        )
        .bind(&item.id)
        .bind(item.user_id)
        .bind(&item.url)
        .bind(&item.title)
        .bind(item.current_price)
        .bind(item.target_price)
        .bind(item.last_checked_at)
        .bind(&item.last_error)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_by_user_and_url(user_id, url)
            .await?
            .ok_or_else(|| AppError::Internal("upsert left no row behind".to_string()))
    }

    pub async fn find_by_user_and_url(
        &self,
        user_id: i64,
        url: &str,
    ) -> Result<Option<TrackedItem>> {
        let item = sqlx::query_as::<_, TrackedItem>(
            "SELECT * FROM tracked_items WHERE user_id = ? AND url = ?",
        )
        .bind(user_id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn get(&self, item_id: &str) -> Result<Option<TrackedItem>> {
        let item = sqlx::query_as::<_, TrackedItem>("SELECT * FROM tracked_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Items in insertion order, so list positions stay stable for the
    /// index-based stop/target commands.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<TrackedItem>> {
        let items = sqlx::query_as::<_, TrackedItem>(
            "SELECT * FROM tracked_items WHERE user_id = ? ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn list_all(&self) -> Result<Vec<TrackedItem>> {
        let items =
            sqlx::query_as::<_, TrackedItem>("SELECT * FROM tracked_items ORDER BY created_at, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(items)
    }

    /// Item at the given 1-based position in the user's list.
    pub async fn item_at(&self, user_id: i64, index: usize) -> Result<TrackedItem> {
        let mut items = self.list_for_user(user_id).await?;
        if index == 0 || index > items.len() {
            return Err(AppError::not_found(format!(
                "tracked item #{} for user {}",
                index, user_id
            )));
        }
        Ok(items.remove(index - 1))
    }

    /// Delete the item at the given 1-based position along with its history.
    pub async fn remove_at(&self, user_id: i64, index: usize) -> Result<TrackedItem> {
        let item = self.item_at(user_id, index).await?;
        sqlx::query("DELETE FROM tracked_items WHERE id = ?")
            .bind(&item.id)
            .execute(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn set_target_price(&self, item_id: &str, target: Option<f64>) -> Result<()> {
        let result =
            sqlx::query("UPDATE tracked_items SET target_price = ?, updated_at = ? WHERE id = ?")
                .bind(target)
                .bind(Utc::now())
                .bind(item_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("tracked item {}", item_id)));
        }
        Ok(())
    }

    /// Commit one extraction attempt. Success updates title/price/timestamp,
    /// clears the error, and appends a history row in the same transaction.
    /// Failure records the error and timestamp, leaving price/title intact.
    pub async fn apply_check_result(&self, item_id: &str, outcome: &CheckOutcome) -> Result<()> {
        let now = Utc::now();
        match outcome {
            CheckOutcome::Success { title, price } => {
                let mut tx = self.pool.begin().await?;

                let result = sqlx::query(
                    r#"
                    UPDATE tracked_items
                    SET title = ?, current_price = ?, last_checked_at = ?,
                        last_error = NULL, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(title)
                .bind(price)
                .bind(now)
                .bind(now)
                .bind(item_id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::not_found(format!("tracked item {}", item_id)));
                }

                let point = PricePoint::new(item_id, *price);
                sqlx::query(
                    "INSERT INTO price_history (id, item_id, price, recorded_at) VALUES (?, ?, ?, ?)",
                )
                .bind(&point.id)
                .bind(&point.item_id)
                .bind(point.price)
                .bind(point.recorded_at)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
            }
            CheckOutcome::Failure { error } => {
                let result = sqlx::query(
                    r#"
                    UPDATE tracked_items
                    SET last_error = ?, last_checked_at = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(error)
                .bind(now)
                .bind(now)
                .bind(item_id)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::not_found(format!("tracked item {}", item_id)));
                }
            }
        }
        Ok(())
    }

    /// Most recent price observations for an item, newest first.
    pub async fn price_history(&self, item_id: &str, limit: u32) -> Result<Vec<PricePoint>> {
        let points = sqlx::query_as::<_, PricePoint>(
            "SELECT * FROM price_history WHERE item_id = ? ORDER BY recorded_at DESC, id LIMIT ?",
        )
        .bind(item_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(points)
    }
}
