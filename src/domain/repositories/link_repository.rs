//! Repository trait for the authoritative link store.

use crate::domain::entities::{Link, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for persisted short links.
///
/// This is the single source of truth for which keys exist. Point lookups are
/// served by the unique index on `shorten_key`, dedup lookups by the composite
/// index on `(original_url, owner_id)`, listings by the index on `owner_id`.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Stores a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the key is already taken.
    /// Returns [`AppError::Unavailable`] on database errors.
    async fn insert(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by its short key.
    async fn find_by_key(&self, shorten_key: &str) -> Result<Option<Link>, AppError>;

    /// Finds the link a caller already registered for `original_url`.
    ///
    /// `owner_id = None` matches anonymous links only.
    async fn find_by_url_and_owner(
        &self,
        original_url: &str,
        owner_id: Option<i64>,
    ) -> Result<Option<Link>, AppError>;

    /// Lists every link owned by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError>;

    /// Raises the stored click count to `count`.
    ///
    /// Never lowers an existing count. Returns `Ok(false)` if the key is unknown.
    async fn update_click_count(&self, shorten_key: &str, count: i64) -> Result<bool, AppError>;

    /// Returns up to `limit` keys ordered ascending, strictly after `cursor`.
    ///
    /// Used to stream the full key set page by page.
    async fn keys_after(&self, cursor: Option<String>, limit: i64)
    -> Result<Vec<String>, AppError>;

    /// Counts all stored links.
    async fn count(&self) -> Result<i64, AppError>;

    /// Round trip to the store without touching link data.
    async fn ping(&self) -> Result<(), AppError>;
}
