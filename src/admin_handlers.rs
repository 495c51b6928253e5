use std::{cmp::Reverse, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use axum_macros::debug_handler;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth,
    config::AppState,
    db::DB,
    models::{Document, DocumentFilter, UpdateUser, User},
    response::{ResponseError, ResponseResult},
    validation::ValidJson,
};

const STATS_TOP: usize = 5;

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsDocument {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub downloads: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: usize,
    pub total_documents: usize,
    pub total_downloads: i64,
    pub total_comments: usize,
    pub total_ratings: usize,
    pub recent_documents: Vec<StatsDocument>,
    pub popular_documents: Vec<StatsDocument>,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "All users, without password hashes", body = [User]),
        (status = 403, description = "Admin access required", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, ResponseError> {
    Ok(Json(state.db.list_users().await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input or email taken", body = crate::response::ErrorBody),
        (status = 404, description = "User not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ValidJson(mut body): ValidJson<UpdateUser>,
) -> Result<Json<User>, ResponseError> {
    if let Some(email) = &body.email {
        if let Some(other) = state.db.get_user_by_email(email).await? {
            if other.id != id {
                return Err(ResponseError::BadRequest("Email already exists".to_string()));
            }
        }
    }

    if let Some(password) = body.password.take() {
        let hash = auth::hash_password(password, state.config.bcrypt_cost())
            .await
            .map_err(|err| {
                log::error!("{:#}", err);
                ResponseError::InternalServerError
            })?;
        body.password = Some(hash);
    }

    match state.db.update_user(id, body).await? {
        Some(user) => Ok(Json(user)),
        None => Err(ResponseError::NotFound("User not found".to_string())),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = crate::response::MessageResponse),
        (status = 400, description = "Cannot delete your own account", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<User>,
) -> Result<ResponseResult, ResponseError> {
    if id == user.id {
        return Err(ResponseError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    state.db.delete_user(id).await?;
    log::info!("user {} deleted by '{}'", id, user.username);

    Ok(ResponseResult::Message("User deleted successfully".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    responses(
        (status = 200, description = "Dashboard totals", body = StatsResponse),
        (status = 403, description = "Admin access required", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ResponseError> {
    let total_users = state.db.list_users().await?.len();
    let subjects: HashMap<i64, String> = state
        .db
        .list_subjects()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    let mut documents = state.db.list_documents(&DocumentFilter::default()).await?;

    let mut total_comments = 0;
    let mut total_ratings = 0;
    for document in &documents {
        total_comments += state.db.list_comments_by_document(document.id).await?.len();
        total_ratings += state.db.list_ratings_by_document(document.id).await?.len();
    }

    let stats_document = |document: &Document| StatsDocument {
        id: document.id,
        title: document.title.clone(),
        subject: subjects
            .get(&document.subject_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        downloads: document.downloads,
    };

    documents.sort_by_key(|d| Reverse((d.created_at, d.id)));
    let recent_documents = documents.iter().take(STATS_TOP).map(stats_document).collect();

    documents.sort_by_key(|d| Reverse((d.downloads, d.id)));
    let popular_documents = documents.iter().take(STATS_TOP).map(stats_document).collect();

    Ok(Json(StatsResponse {
        total_users,
        total_documents: documents.len(),
        total_downloads: documents.iter().map(|d| d.downloads).sum(),
        total_comments,
        total_ratings,
        recent_documents,
        popular_documents,
    }))
}
