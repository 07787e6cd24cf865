//! DTOs for link registration and listing endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::Link;

/// Request to register a URL.
///
/// The caller is trusted: `url` is stored as given and `owner_id` is an
/// already authenticated identity (or absent for anonymous links).
#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

/// Query string of `GET /api/links`.
#[derive(Debug, Deserialize)]
pub struct ListLinksQuery {
    pub owner_id: i64,
}

/// A registered link.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub shorten_key: String,
    pub short_url: String,
    pub original_url: String,
    pub owner_id: Option<i64>,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    /// False when an identical registration already existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

impl LinkResponse {
    pub fn from_link(link: Link, short_url: String) -> Self {
        Self {
            shorten_key: link.shorten_key,
            short_url,
            original_url: link.original_url,
            owner_id: link.owner_id,
            click_count: link.click_count,
            created_at: link.created_at,
            created: None,
        }
    }

    pub fn with_created(mut self, created: bool) -> Self {
        self.created = Some(created);
        self
    }
}

/// Links registered by one owner.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkListResponse {
    pub owner_id: i64,
    pub total: usize,
    pub items: Vec<LinkResponse>,
}
