use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{auth::SignInResponse, db, models::User, validation::FieldError};

/// JSON body of every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// JSON body carrying a human readable outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug)]
pub enum ResponseError {
    InternalServerError,
    NotFound(String),
    Unauthorized(String),
    BadRequest(String),
    Forbidden(String),
    Validation(Vec<FieldError>),
}

impl ResponseError {
    fn status(&self) -> StatusCode {
        match self {
            ResponseError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ResponseError::NotFound(_) => StatusCode::NOT_FOUND,
            ResponseError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ResponseError::BadRequest(_) | ResponseError::Validation(_) => StatusCode::BAD_REQUEST,
            ResponseError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response<Body> {
        let status = self.status();
        let body = match self {
            ResponseError::InternalServerError => ErrorBody {
                message: "Internal server error".to_string(),
                errors: None,
            },
            ResponseError::NotFound(msg)
            | ResponseError::Unauthorized(msg)
            | ResponseError::BadRequest(msg)
            | ResponseError::Forbidden(msg) => ErrorBody {
                message: msg,
                errors: None,
            },
            ResponseError::Validation(errors) => ErrorBody {
                message: "Validation failed".to_string(),
                errors: Some(errors),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<db::Error> for ResponseError {
    fn from(err: db::Error) -> Self {
        match err {
            db::Error::Duplicate(what) => ResponseError::BadRequest(format!(
                "{}{} already exists",
                what[..1].to_uppercase(),
                &what[1..]
            )),
            err => {
                log::error!("storage operation failed: {}", err);
                ResponseError::InternalServerError
            }
        }
    }
}

pub enum ResponseResult {
    Health,
    SignedIn(SignInResponse, String),
    Registered(User, String),
    SignedOut(String),
    Message(String),
}

impl IntoResponse for ResponseResult {
    fn into_response(self) -> Response<Body> {
        match self {
            ResponseResult::Health => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "success",
                    "message": "bachub server is working"
                })),
            )
                .into_response(),
            ResponseResult::SignedIn(body, cookie) => {
                (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
            }
            ResponseResult::Registered(user, cookie) => {
                (StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(user)).into_response()
            }
            ResponseResult::SignedOut(cookie) => (
                StatusCode::OK,
                [(header::SET_COOKIE, cookie)],
                Json(MessageResponse {
                    message: "Logged out successfully".to_string(),
                }),
            )
                .into_response(),
            ResponseResult::Message(message) => {
                (StatusCode::OK, Json(MessageResponse { message })).into_response()
            }
        }
    }
}
