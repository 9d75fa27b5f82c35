use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::models::article::NewComment;
use crate::models::{Article, ArticleDraft, ArticlePage, ArticleQuery};

use super::Gateway;

impl Gateway {
    pub async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage, AuthError> {
        let page: ArticlePage = self.get_with_query("/articles", query).await?;
        debug!(count = page.articles.len(), total = page.total, "Fetched articles");
        Ok(page)
    }

    pub async fn get_article(&self, id: &str) -> Result<Article, AuthError> {
        self.get(&format!("/articles/{}", id)).await
    }

    /// Toggle the current user's like, then return the updated article.
    pub async fn like_article(&self, id: &str) -> Result<Article, AuthError> {
        self.post::<IgnoredAny, ()>(&format!("/articles/{}/like", id), None)
            .await?;
        self.get_article(id).await
    }

    /// Add a comment and return the updated article.
    pub async fn add_comment(&self, id: &str, content: &str) -> Result<Article, AuthError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AuthError::validation("Comment cannot be empty"));
        }
        self.post::<IgnoredAny, _>(
            &format!("/articles/{}/comments", id),
            Some(&NewComment { content }),
        )
        .await?;
        self.get_article(id).await
    }

    pub async fn delete_comment(&self, article_id: &str, comment_id: &str) -> Result<(), AuthError> {
        self.delete(&format!("/articles/{}/comments/{}", article_id, comment_id))
            .await
    }

    /// Publish a new article.
    pub async fn create_article(&self, draft: &ArticleDraft) -> Result<Article, AuthError> {
        self.submit_draft(Method::POST, "/articles", draft).await
    }

    /// Replace an existing article's fields.
    pub async fn update_article(&self, id: &str, draft: &ArticleDraft) -> Result<Article, AuthError> {
        self.submit_draft(Method::PUT, &format!("/articles/{}", id), draft)
            .await
    }

    async fn submit_draft(
        &self,
        method: Method,
        path: &str,
        draft: &ArticleDraft,
    ) -> Result<Article, AuthError> {
        let problems = draft.problems();
        if !problems.is_empty() {
            return Err(AuthError::Validation(problems));
        }

        // Form is consumed by the request, so a replay builds a fresh one
        let envelope: ArticleEnvelope = self
            .send(|api, token| {
                api.request(method.clone(), path, token)
                    .multipart(draft_form(draft))
            })
            .await?;
        let article = envelope.into_article();
        info!(id = %article.id, %method, "Article saved");
        Ok(article)
    }

    /// Admin only.
    pub async fn delete_article(&self, id: &str) -> Result<(), AuthError> {
        self.delete(&format!("/articles/{}", id)).await
    }
}

fn draft_form(draft: &ArticleDraft) -> Form {
    let tags = serde_json::to_string(&draft.tags).unwrap_or_else(|_| "[]".to_string());
    let mut form = Form::new()
        .text("title", draft.title.trim().to_string())
        .text("content", draft.content.clone())
        .text("category", draft.category.clone())
        .text("tags", tags)
        .text("readTime", draft.read_time.to_string());

    if let Some(url) = draft.image_url.as_ref().filter(|u| !u.is_empty()) {
        form = form.text("imageUrl", url.clone());
    }
    if let Some(url) = draft.video_url.as_ref().filter(|u| !u.is_empty()) {
        form = form.text("videoUrl", url.clone());
    }
    if let Some(media) = &draft.media {
        form = form.part(
            "media",
            Part::bytes(media.bytes.clone()).file_name(media.file_name.clone()),
        );
    }
    form
}

/// Create answers `{ message, article }`; some deployments return the bare article.
#[derive(Deserialize)]
#[serde(untagged)]
enum ArticleEnvelope {
    Wrapped { article: Article },
    Bare(Article),
}

impl ArticleEnvelope {
    fn into_article(self) -> Article {
        match self {
            ArticleEnvelope::Wrapped { article } | ArticleEnvelope::Bare(article) => article,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_wrapped_and_bare() {
        let wrapped: ArticleEnvelope = serde_json::from_str(
            r#"{"message":"Article created successfully","article":{"_id":"a1","title":"T","content":"C"}}"#,
        )
        .unwrap();
        assert_eq!(wrapped.into_article().id, "a1");

        let bare: ArticleEnvelope =
            serde_json::from_str(r#"{"_id":"a2","title":"T","content":"C"}"#).unwrap();
        assert_eq!(bare.into_article().id, "a2");
    }
}
