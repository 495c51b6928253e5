use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::validation::{FieldError, Validate, Validator};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    /// UI tag color, e.g. "blue"
    pub color: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewSubject {
    pub name: String,
    pub color: String,
}

impl Validate for NewSubject {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .non_empty("name", &self.name)
            .non_empty("color", &self.color)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateSubject {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Validate for UpdateSubject {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.non_empty("name", name);
        }
        if let Some(color) = &self.color {
            v.non_empty("color", color);
        }
        v.finish()
    }
}
