use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::validation::{FieldError, Validate, Validator};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i64,
    pub document_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub document_id: i64,
    pub user_id: i64,
    pub rating: i32,
}

/// Body of a rating request, the document and user come from the route.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RatingBody {
    pub rating: i32,
}

impl Validate for RatingBody {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .range("rating", self.rating, MIN_RATING, MAX_RATING)
            .finish()
    }
}
