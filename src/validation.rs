use std::fmt::Display;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

use crate::response::ResponseError;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Request bodies that check their own shape before reaching the store.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// Collects field errors so a client gets every problem in one response.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), "must not be empty")
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            self.errors.push(FieldError::new(
                field,
                format!("must be at least {} characters", min),
            ));
        }
        self
    }

    pub fn range<T: PartialOrd + Display>(
        &mut self,
        field: &str,
        value: T,
        min: T,
        max: T,
    ) -> &mut Self {
        if value < min || value > max {
            self.errors.push(FieldError::new(
                field,
                format!("must be between {} and {}", min, max),
            ));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.contains(char::is_whitespace)
            }
            None => false,
        };
        self.check(field, valid, "must be a valid email address")
    }

    pub fn finish(&mut self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

/// JSON extractor that runs [`Validate`] and reports malformed bodies as
/// validation failures instead of axum's plain-text rejection.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ResponseError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ResponseError::Validation(vec![FieldError::new("body", rejection.body_text())])
            })?;

        value.validate().map_err(ResponseError::Validation)?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collects_every_error() {
        let errors = Validator::new()
            .non_empty("title", "  ")
            .min_len("password", "abc", 6)
            .range("rating", 7, 1, 5)
            .email("email", "nobody")
            .finish()
            .unwrap_err();

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "password", "rating", "email"]);
    }

    #[test]
    fn accepts_valid_input() {
        assert!(Validator::new()
            .non_empty("title", "Bac D")
            .min_len("username", "eleve", 3)
            .range("rating", 5, 1, 5)
            .email("email", "eleve@example.com")
            .finish()
            .is_ok());
    }

    #[test]
    fn rejects_bad_emails() {
        for email in ["@example.com", "a@example", "a@.com", "a b@example.com"] {
            assert!(
                Validator::new().email("email", email).finish().is_err(),
                "{} should be rejected",
                email
            );
        }
    }
}
