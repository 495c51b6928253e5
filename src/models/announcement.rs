use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::validation::{FieldError, Validate, Validator};

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: i64,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(skip_deserializing)]
    pub created_by: i64,
}

impl Validate for NewAnnouncement {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .non_empty("title", &self.title)
            .non_empty("content", &self.content)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateAnnouncement {
    pub title: Option<String>,
    pub content: Option<String>,
    pub active: Option<bool>,
}

impl Validate for UpdateAnnouncement {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        if let Some(title) = &self.title {
            v.non_empty("title", title);
        }
        if let Some(content) = &self.content {
            v.non_empty("content", content);
        }
        v.finish()
    }
}
