//! In-process implementation of link repository.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

#[derive(Default)]
struct Table {
    next_id: i64,
    by_key: BTreeMap<String, Link>,
}

/// Link repository held in process memory.
///
/// Enforces the same uniqueness rule on `shorten_key` as the PostgreSQL
/// schema. Backs the in-process test harness.
#[derive(Default)]
pub struct MemoryLinkRepository {
    table: RwLock<Table>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored key, ascending.
    pub fn keys(&self) -> Vec<String> {
        self.table.read().by_key.keys().cloned().collect()
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn insert(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut table = self.table.write();

        if table.by_key.contains_key(&new_link.shorten_key) {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": "links_shorten_key_key" }),
            ));
        }

        table.next_id += 1;
        let now = Utc::now();
        let link = Link::new(
            table.next_id,
            new_link.shorten_key,
            new_link.original_url,
            new_link.owner_id,
            0,
            now,
            now,
        );
        table.by_key.insert(link.shorten_key.clone(), link.clone());

        Ok(link)
    }

    async fn find_by_key(&self, shorten_key: &str) -> Result<Option<Link>, AppError> {
        Ok(self.table.read().by_key.get(shorten_key).cloned())
    }

    async fn find_by_url_and_owner(
        &self,
        original_url: &str,
        owner_id: Option<i64>,
    ) -> Result<Option<Link>, AppError> {
        Ok(self
            .table
            .read()
            .by_key
            .values()
            .filter(|l| l.original_url == original_url && l.owner_id == owner_id)
            .min_by_key(|l| l.id)
            .cloned())
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        let mut links: Vec<Link> = self
            .table
            .read()
            .by_key
            .values()
            .filter(|l| l.owner_id == Some(owner_id))
            .cloned()
            .collect();

        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(links)
    }

    async fn update_click_count(&self, shorten_key: &str, count: i64) -> Result<bool, AppError> {
        let mut table = self.table.write();

        match table.by_key.get_mut(shorten_key) {
            Some(link) => {
                link.click_count = link.click_count.max(count);
                link.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys_after(
        &self,
        cursor: Option<String>,
        limit: i64,
    ) -> Result<Vec<String>, AppError> {
        let table = self.table.read();
        let lower = match &cursor {
            Some(c) => Bound::Excluded(c.clone()),
            None => Bound::Unbounded,
        };

        Ok(table
            .by_key
            .range((lower, Bound::Unbounded))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.table.read().by_key.len() as i64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
