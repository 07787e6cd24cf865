//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str =
    "id, shorten_key, original_url, owner_id, click_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    shorten_key: String,
    original_url: String,
    owner_id: Option<i64>,
    click_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link::new(
            r.id,
            r.shorten_key,
            r.original_url,
            r.owner_id,
            r.click_count,
            r.created_at,
            r.updated_at,
        )
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Uses bound parameters throughout; every lookup is served by one of the
/// indexes created in `migrations/`.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn insert(&self, new_link: NewLink) -> Result<Link, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            r#"
            INSERT INTO links (shorten_key, original_url, owner_id)
            VALUES ($1, $2, $3)
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(&new_link.shorten_key)
        .bind(&new_link.original_url)
        .bind(new_link.owner_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_by_key(&self, shorten_key: &str) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE shorten_key = $1"
        ))
        .bind(shorten_key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    async fn find_by_url_and_owner(
        &self,
        original_url: &str,
        owner_id: Option<i64>,
    ) -> Result<Option<Link>, AppError> {
        // Split so both branches can use the (original_url, owner_id) index.
        let row = match owner_id {
            Some(owner_id) => {
                sqlx::query_as::<_, LinkRow>(&format!(
                    r#"
                    SELECT {LINK_COLUMNS} FROM links
                    WHERE original_url = $1 AND owner_id = $2
                    ORDER BY id
                    LIMIT 1
                    "#
                ))
                .bind(original_url)
                .bind(owner_id)
                .fetch_optional(self.pool.as_ref())
                .await?
            }
            None => {
                sqlx::query_as::<_, LinkRow>(&format!(
                    r#"
                    SELECT {LINK_COLUMNS} FROM links
                    WHERE original_url = $1 AND owner_id IS NULL
                    ORDER BY id
                    LIMIT 1
                    "#
                ))
                .bind(original_url)
                .fetch_optional(self.pool.as_ref())
                .await?
            }
        };

        Ok(row.map(Link::from))
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            r#"
            SELECT {LINK_COLUMNS} FROM links
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn update_click_count(&self, shorten_key: &str, count: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET click_count = GREATEST(click_count, $2), updated_at = NOW()
            WHERE shorten_key = $1
            "#,
        )
        .bind(shorten_key)
        .bind(count)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn keys_after(
        &self,
        cursor: Option<String>,
        limit: i64,
    ) -> Result<Vec<String>, AppError> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT shorten_key FROM links
            WHERE ($1::varchar IS NULL OR shorten_key > $1)
            ORDER BY shorten_key
            LIMIT $2
            "#,
        )
        .bind(cursor)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(keys)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM links")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}
