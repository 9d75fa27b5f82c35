//! Data models for cyberread entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `Identity`, `ProfileUpdate`: the signed-in user and profile edits
//! - `Article`, `Comment`, `ArticlePage`: articles and listings
//! - `SecurityTip`: tips shown in the tip banner
//! - Admin types: `AdminStats`, `UserSummary`, `UserPage`

pub mod admin;
pub mod article;
pub mod tip;
pub mod user;

pub use admin::{AdminStats, PageQuery, UserPage, UserSummary};
pub use article::{Article, ArticleDraft, ArticlePage, ArticleQuery, Comment, MediaUpload, UserRef};
pub use tip::SecurityTip;
pub use user::{Identity, ProfileRequest, ProfileUpdate};
