//! Admin dashboard endpoints. The backend enforces admin rights; a
//! non-admin gets `AuthError::Forbidden` from the 403.

use serde::de::IgnoredAny;
use tracing::info;

use crate::error::AuthError;
use crate::models::{AdminStats, ArticlePage, PageQuery, UserPage};

use super::Gateway;

impl Gateway {
    pub async fn admin_stats(&self) -> Result<AdminStats, AuthError> {
        self.get("/users/admin/stats").await
    }

    pub async fn list_users(&self, page: PageQuery) -> Result<UserPage, AuthError> {
        self.get_with_query("/users", &page).await
    }

    pub async fn list_admin_articles(&self, page: PageQuery) -> Result<ArticlePage, AuthError> {
        self.get_with_query("/articles", &page).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.delete(&format!("/users/{}", user_id)).await?;
        info!(user_id, "User deleted");
        Ok(())
    }

    pub async fn freeze_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.put::<IgnoredAny>(&format!("/users/{}/freeze", user_id))
            .await?;
        info!(user_id, "User frozen");
        Ok(())
    }

    pub async fn unfreeze_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.put::<IgnoredAny>(&format!("/users/{}/unfreeze", user_id))
            .await?;
        info!(user_id, "User unfrozen");
        Ok(())
    }
}
