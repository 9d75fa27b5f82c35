use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short security tip shown in the tip banner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityTip {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}
