//! Link entity representing a shortened URL mapping.

use chrono::{DateTime, Utc};

/// A persisted short link.
///
/// `shorten_key` and `original_url` never change after insertion;
/// `click_count` only ever grows and trails the fast click counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: i64,
    pub shorten_key: String,
    pub original_url: String,
    pub owner_id: Option<i64>,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        id: i64,
        shorten_key: String,
        original_url: String,
        owner_id: Option<i64>,
        click_count: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            shorten_key,
            original_url,
            owner_id,
            click_count,
            created_at,
            updated_at,
        }
    }

    /// Returns true if the link belongs to no one.
    pub fn is_anonymous(&self) -> bool {
        self.owner_id.is_none()
    }
}

/// Input data for registering a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub shorten_key: String,
    pub original_url: String,
    pub owner_id: Option<i64>,
}

/// How a resolved link should be redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Anonymous links: clients and proxies may cache the redirect.
    Permanent,
    /// Owned links: every visit must come back so it can be counted.
    Temporary,
}

/// The outcome of resolving a short key, from cache or store.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub original_url: String,
    pub owner_id: Option<i64>,
}

impl Resolution {
    pub fn redirect_kind(&self) -> RedirectKind {
        match self.owner_id {
            Some(_) => RedirectKind::Temporary,
            None => RedirectKind::Permanent,
        }
    }
}

impl From<&Link> for Resolution {
    fn from(link: &Link) -> Self {
        Self {
            original_url: link.original_url.clone(),
            owner_id: link.owner_id,
        }
    }
}

/// Result of a shorten request.
///
/// `created` is false when an identical `(original_url, owner_id)` pair was
/// already registered and its existing key is returned instead.
#[derive(Debug, Clone)]
pub struct ShortenOutcome {
    pub link: Link,
    pub created: bool,
}
