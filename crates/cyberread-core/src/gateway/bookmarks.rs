use serde::de::IgnoredAny;

use crate::error::AuthError;
use crate::models::Article;

use super::Gateway;

impl Gateway {
    pub async fn bookmarks(&self) -> Result<Vec<Article>, AuthError> {
        self.get("/bookmarks").await
    }

    pub async fn add_bookmark(&self, article_id: &str) -> Result<(), AuthError> {
        self.post::<IgnoredAny, ()>(&format!("/bookmarks/{}", article_id), None)
            .await?;
        Ok(())
    }

    pub async fn remove_bookmark(&self, article_id: &str) -> Result<(), AuthError> {
        self.delete(&format!("/bookmarks/{}", article_id)).await
    }

    /// Whether the article is bookmarked. A 404 means "no"; any other
    /// failure is a real error.
    pub async fn is_bookmarked(&self, article_id: &str) -> Result<bool, AuthError> {
        match self
            .get::<IgnoredAny>(&format!("/bookmarks/{}", article_id))
            .await
        {
            Ok(_) => Ok(true),
            Err(AuthError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
