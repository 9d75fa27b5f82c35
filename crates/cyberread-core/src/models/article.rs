//! Articles, comments and article listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{format_date, truncate_string};

/// Author or commenter reference embedded in an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub user: UserRef,
    pub content: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: UserRef,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "readTime", default)]
    pub read_time: u32,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Ids of users who liked the article
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Moderation status, only present in admin listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Length of the plain-text excerpt shown in listings.
const EXCERPT_LENGTH: usize = 100;

impl Article {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    pub fn excerpt(&self) -> String {
        let flat = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_string(&flat, EXCERPT_LENGTH)
    }

    pub fn published(&self) -> String {
        self.created_at
            .map(|dt| format_date(&dt.to_rfc3339()))
            .unwrap_or_else(|| "unpublished".to_string())
    }
}

/// One page of `GET /articles`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "currentPage", default)]
    pub current_page: u32,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

/// Filters for `GET /articles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Category preselected in the editor.
const DEFAULT_CATEGORY: &str = "cybersecurity";

/// Read time preselected in the editor, in minutes.
const DEFAULT_READ_TIME: u32 = 3;

/// An article as written in the editor, before or after publishing.
/// Sent as multipart form data, so it is not a serde type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub read_time: u32,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub media: Option<MediaUpload>,
}

/// An image or video file attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ArticleDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            read_time: DEFAULT_READ_TIME,
            image_url: None,
            video_url: None,
            media: None,
        }
    }

    /// Start an edit from a published article. Existing media stays
    /// referenced by URL.
    pub fn from_article(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            category: article.category.clone(),
            tags: article.tags.clone(),
            read_time: article.read_time,
            image_url: article.image_url.clone(),
            video_url: article.video_url.clone(),
            media: None,
        }
    }

    /// Split comma-separated tags as typed by the user.
    pub fn parse_tags(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Messages for missing required fields; empty when the draft can be sent.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push("Title is required".to_string());
        }
        if self.content.trim().is_empty() {
            problems.push("Content is required".to_string());
        }
        problems
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewComment<'a> {
    pub content: &'a str,
}
