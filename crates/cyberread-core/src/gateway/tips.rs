use crate::error::AuthError;
use crate::models::SecurityTip;

use super::Gateway;

impl Gateway {
    pub async fn security_tips(&self) -> Result<Vec<SecurityTip>, AuthError> {
        self.get("/security-tips").await
    }

    pub async fn security_tip(&self, id: &str) -> Result<SecurityTip, AuthError> {
        self.get(&format!("/security-tips/{}", id)).await
    }

    pub async fn random_security_tip(&self) -> Result<SecurityTip, AuthError> {
        self.get("/security-tips/random").await
    }
}
