use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_macros::debug_handler;

use crate::{
    config::AppState,
    db::DB,
    models::{NewSubject, Subject, UpdateSubject},
    response::{ResponseError, ResponseResult},
    validation::ValidJson,
};

#[utoipa::path(
    get,
    path = "/api/subjects",
    tag = "Subjects",
    responses(
        (status = 200, description = "All subjects", body = [Subject]),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn list_subjects_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Subject>>, ResponseError> {
    Ok(Json(state.db.list_subjects().await?))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{id}",
    tag = "Subjects",
    params(("id" = i64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Subject found", body = Subject),
        (status = 404, description = "Subject not found", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn get_subject_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Subject>, ResponseError> {
    match state.db.get_subject(id).await? {
        Some(subject) => Ok(Json(subject)),
        None => Err(ResponseError::NotFound("Subject not found".to_string())),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/subjects",
    tag = "Admin",
    request_body = NewSubject,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Invalid input or name taken", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn create_subject_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<NewSubject>,
) -> Result<(StatusCode, Json<Subject>), ResponseError> {
    let subject = state.db.create_subject(body).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

#[utoipa::path(
    put,
    path = "/api/admin/subjects/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Subject id")),
    request_body = UpdateSubject,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 400, description = "Invalid input or name taken", body = crate::response::ErrorBody),
        (status = 404, description = "Subject not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn update_subject_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ValidJson(body): ValidJson<UpdateSubject>,
) -> Result<Json<Subject>, ResponseError> {
    match state.db.update_subject(id, body).await? {
        Some(subject) => Ok(Json(subject)),
        None => Err(ResponseError::NotFound("Subject not found".to_string())),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/subjects/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Subject id")),
    responses(
        (status = 200, description = "Subject deleted", body = crate::response::MessageResponse),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn delete_subject_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ResponseResult, ResponseError> {
    state.db.delete_subject(id).await?;

    Ok(ResponseResult::Message(
        "Subject deleted successfully".to_string(),
    ))
}
