use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::validation::{FieldError, Validate, Validator};

const MAX_CONTENT_LEN: usize = 5000;

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub document_id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_admin_response: bool,
    /// reply threading, stored but not used by any listing
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub document_id: i64,
    pub user_id: i64,
    pub content: String,
    pub is_admin_response: bool,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl Validate for CommentBody {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .non_empty("content", &self.content)
            .check(
                "content",
                self.content.chars().count() <= MAX_CONTENT_LEN,
                "is too long",
            )
            .finish()
    }
}
