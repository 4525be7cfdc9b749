use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::StoreError;
use crate::karma::repo_types::{KarmaEntry, KarmaEntryRow, NewKarmaEntry};

/// Append-only ledger storage. Ranges are half-open: `[from, until)`.
#[async_trait]
pub trait KarmaStore: Send + Sync {
    async fn insert(&self, entry: NewKarmaEntry) -> Result<KarmaEntry, StoreError>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<KarmaEntry>, StoreError>;

    async fn list_between(
        &self,
        user_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<KarmaEntry>, StoreError>;

    /// Number of deleted entries.
    async fn delete_between(
        &self,
        user_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgKarmaStore {
    db: PgPool,
}

impl PgKarmaStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_entry(row: KarmaEntryRow) -> Result<KarmaEntry, StoreError> {
    KarmaEntry::try_from(row).map_err(|e| StoreError::from(sqlx::Error::Decode(Box::new(e))))
}

fn into_entries(rows: Vec<KarmaEntryRow>) -> Result<Vec<KarmaEntry>, StoreError> {
    rows.into_iter().map(into_entry).collect()
}

#[async_trait]
impl KarmaStore for PgKarmaStore {
    async fn insert(&self, entry: NewKarmaEntry) -> Result<KarmaEntry, StoreError> {
        let row = sqlx::query_as::<_, KarmaEntryRow>(
            r#"
            INSERT INTO karma_entries (id, user_id, type, points, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, type, points, created_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.kind.as_str())
        .bind(entry.points)
        .bind(entry.created_at)
        .fetch_one(&self.db)
        .await?;
        into_entry(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<KarmaEntry>, StoreError> {
        let rows = sqlx::query_as::<_, KarmaEntryRow>(
            r#"
            SELECT id, user_id, type, points, created_at
              FROM karma_entries
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        into_entries(rows)
    }

    async fn list_between(
        &self,
        user_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<KarmaEntry>, StoreError> {
        let rows = sqlx::query_as::<_, KarmaEntryRow>(
            r#"
            SELECT id, user_id, type, points, created_at
              FROM karma_entries
             WHERE user_id = $1
               AND created_at >= $2
               AND created_at < $3
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.db)
        .await?;
        into_entries(rows)
    }

    async fn delete_between(
        &self,
        user_id: Uuid,
        from: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM karma_entries
             WHERE user_id = $1
               AND created_at >= $2
               AND created_at < $3
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(until)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}
