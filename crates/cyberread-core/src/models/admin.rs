//! Admin dashboard types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(rename = "totalUsers", default)]
    pub total_users: u64,
    #[serde(rename = "totalArticles", default)]
    pub total_articles: u64,
    #[serde(rename = "totalBookmarks", default)]
    pub total_bookmarks: u64,
    #[serde(rename = "totalComments", default)]
    pub total_comments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "isFrozen", default)]
    pub is_frozen: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<UserSummary>,
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "currentPage", default)]
    pub current_page: u32,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}
