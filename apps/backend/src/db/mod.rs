//! PostgreSQL card store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use review_core::{Card, CardId, CardStore, NewCard, OwnerId, StoreError, StoreResult};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::DbCard;

const CARD_COLUMNS: &str = "id, owner_id, path_id, front_text, back_text, tags, difficulty, \
     review_count, success_count, last_reviewed, next_due, version, created_at";

/// Card store with connection pool
#[derive(Clone)]
pub struct PgCardStore {
    pool: PgPool,
}

impl PgCardStore {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Database(e.into()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn current_version(&self, id: CardId) -> StoreResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT version FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_i64(value: u64, field: &str) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("{field} out of range")))
}

fn to_i32(value: u32, field: &str) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("{field} out of range")))
}

#[async_trait]
impl CardStore for PgCardStore {
    async fn create(&self, new: NewCard) -> StoreResult<Card> {
        let row = sqlx::query_as::<_, DbCard>(&format!(
            r#"
            INSERT INTO cards (id, owner_id, path_id, front_text, back_text, tags)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.owner)
        .bind(new.path_id)
        .bind(&new.front)
        .bind(&new.back)
        .bind(&new.tags)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        row.into_core_card()
    }

    async fn get(&self, owner: OwnerId, id: CardId) -> StoreResult<Card> {
        let row = sqlx::query_as::<_, DbCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound(id))?.into_core_card()
    }

    async fn query_due(
        &self,
        owner: OwnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Card>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, DbCard>(&format!(
            r#"
            SELECT {CARD_COLUMNS}
            FROM cards
            WHERE owner_id = $1 AND (next_due IS NULL OR next_due <= $2)
            ORDER BY next_due ASC NULLS FIRST, id ASC
            LIMIT $3
            "#
        ))
        .bind(owner)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(DbCard::into_core_card).collect()
    }

    async fn count_due(&self, owner: OwnerId, now: DateTime<Utc>) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM cards
            WHERE owner_id = $1 AND (next_due IS NULL OR next_due <= $2)
            "#,
        )
        .bind(owner)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn compare_and_swap(
        &self,
        id: CardId,
        expected_version: u64,
        card: Card,
    ) -> StoreResult<Card> {
        if card.id != id {
            return Err(StoreError::Backend(format!(
                "card id {} does not match target {}",
                card.id, id
            )));
        }
        let expected = to_i64(expected_version, "version")?;

        let row = sqlx::query_as::<_, DbCard>(&format!(
            r#"
            UPDATE cards
            SET path_id = $3,
                front_text = $4,
                back_text = $5,
                tags = $6,
                difficulty = $7,
                review_count = $8,
                success_count = $9,
                last_reviewed = $10,
                next_due = $11,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected)
        .bind(card.path_id)
        .bind(&card.front)
        .bind(&card.back)
        .bind(&card.tags)
        .bind(i16::from(card.difficulty))
        .bind(to_i32(card.review_count, "review_count")?)
        .bind(to_i32(card.success_count, "success_count")?)
        .bind(card.last_reviewed)
        .bind(card.next_due)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        if let Some(row) = row {
            return row.into_core_card();
        }

        match self.current_version(id).await? {
            None => Err(StoreError::NotFound(id)),
            Some(actual) => {
                tracing::warn!(card_id = %id, expected, actual, "version conflict");
                Err(StoreError::VersionConflict {
                    id,
                    expected: expected_version,
                    actual: u64::try_from(actual).unwrap_or_default(),
                })
            }
        }
    }
}
