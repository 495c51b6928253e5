use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::validation::{FieldError, Validate, Validator};

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub year: i32,
    pub subject_id: i64,
    pub file_name: String,
    /// size in bytes
    pub file_size: i64,
    pub uploaded_by: i64,
    /// bumped on every download request, never deduplicated
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub year: i32,
    pub subject_id: i64,
    pub file_name: String,
    pub file_size: i64,
    /// always taken from the session, never from the body
    #[serde(skip_deserializing)]
    pub uploaded_by: i64,
}

impl Validate for NewDocument {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .non_empty("title", &self.title)
            .non_empty("description", &self.description)
            .range("year", self.year, MIN_YEAR, MAX_YEAR)
            .non_empty("fileName", &self.file_name)
            .check("fileSize", self.file_size >= 0, "must not be negative")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocument {
    pub title: Option<String>,
    pub description: Option<String>,
    pub year: Option<i32>,
    pub subject_id: Option<i64>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
}

impl Validate for UpdateDocument {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut v = Validator::new();
        if let Some(title) = &self.title {
            v.non_empty("title", title);
        }
        if let Some(description) = &self.description {
            v.non_empty("description", description);
        }
        if let Some(year) = self.year {
            v.range("year", year, MIN_YEAR, MAX_YEAR);
        }
        if let Some(file_name) = &self.file_name {
            v.non_empty("fileName", file_name);
        }
        if let Some(file_size) = self.file_size {
            v.check("fileSize", file_size >= 0, "must not be negative");
        }
        v.finish()
    }
}

/// Equality filters on subject and year plus a case-insensitive substring
/// match over title and description. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub subject_id: Option<i64>,
    pub year: Option<i32>,
    pub search: Option<String>,
}

impl DocumentFilter {
    pub fn matches(&self, document: &Document) -> bool {
        if self.subject_id.is_some_and(|id| id != document.subject_id) {
            return false;
        }
        if self.year.is_some_and(|year| year != document.year) {
            return false;
        }
        match &self.search {
            Some(search) => {
                let needle = search.to_lowercase();
                document.title.to_lowercase().contains(&needle)
                    || document.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Raw query string for the documents listing. Empty or unparsable numbers
/// are ignored rather than rejected.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DocumentQuery {
    pub subject_id: Option<String>,
    pub year: Option<String>,
    pub search: Option<String>,
}

impl From<DocumentQuery> for DocumentFilter {
    fn from(query: DocumentQuery) -> Self {
        Self {
            subject_id: query.subject_id.and_then(|v| v.trim().parse().ok()),
            year: query.year.and_then(|v| v.trim().parse().ok()),
            search: query.search.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn document(title: &str, description: &str, year: i32, subject_id: i64) -> Document {
        Document {
            id: 1,
            title: title.into(),
            description: description.into(),
            year,
            subject_id,
            file_name: "doc.pdf".into(),
            file_size: 10,
            uploaded_by: 1,
            downloads: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filter_matches() {
        let doc = document("Bac D - Mathématiques", "Sujet complet", 2023, 1);

        assert!(DocumentFilter::default().matches(&doc));
        assert!(DocumentFilter {
            subject_id: Some(1),
            year: Some(2023),
            search: Some("BAC".into()),
        }
        .matches(&doc));
        assert!(DocumentFilter {
            search: Some("complet".into()),
            ..Default::default()
        }
        .matches(&doc));
        assert!(!DocumentFilter {
            year: Some(2022),
            ..Default::default()
        }
        .matches(&doc));
        assert!(!DocumentFilter {
            subject_id: Some(2),
            ..Default::default()
        }
        .matches(&doc));
    }

    #[test]
    fn query_ignores_garbage() {
        let filter: DocumentFilter = DocumentQuery {
            subject_id: Some("abc".into()),
            year: Some("".into()),
            search: Some("   ".into()),
        }
        .into();
        assert_eq!(filter, DocumentFilter::default());

        let filter: DocumentFilter = DocumentQuery {
            subject_id: Some("3".into()),
            year: Some("2023".into()),
            search: Some("philo".into()),
        }
        .into();
        assert_eq!(filter.subject_id, Some(3));
        assert_eq!(filter.year, Some(2023));
        assert_eq!(filter.search.as_deref(), Some("philo"));
    }

    #[test]
    fn new_document_validation() {
        let mut doc = NewDocument {
            title: "".into(),
            description: "desc".into(),
            year: 1800,
            subject_id: 1,
            file_name: "a.pdf".into(),
            file_size: -1,
            uploaded_by: 1,
        };
        let errors = doc.validate().unwrap_err();
        assert_eq!(errors.len(), 3);

        doc.title = "Bac".into();
        doc.year = 2023;
        doc.file_size = 1200;
        assert!(doc.validate().is_ok());
    }
}
