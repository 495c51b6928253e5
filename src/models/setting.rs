use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::validation::{FieldError, Validate, Validator};

/// Site configuration entry. Some values (quick links) hold JSON text.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewSetting {
    pub key: String,
    pub value: String,
}

impl Validate for NewSetting {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new().non_empty("key", &self.key).finish()
    }
}
