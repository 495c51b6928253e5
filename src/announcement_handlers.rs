use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_macros::debug_handler;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    config::AppState,
    db::DB,
    models::{Announcement, NewAnnouncement, UpdateAnnouncement, User},
    response::{ResponseError, ResponseResult},
    validation::ValidJson,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnnouncementQuery {
    /// only `true` restricts the listing to active announcements
    pub active_only: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/announcements",
    tag = "Announcements",
    params(AnnouncementQuery),
    responses(
        (status = 200, description = "Announcements, newest first", body = [Announcement]),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn list_announcements_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnnouncementQuery>,
) -> Result<Json<Vec<Announcement>>, ResponseError> {
    let active_only = query.active_only.as_deref() == Some("true");
    Ok(Json(state.db.list_announcements(active_only).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/announcements",
    tag = "Admin",
    request_body = NewAnnouncement,
    responses(
        (status = 201, description = "Announcement created", body = Announcement),
        (status = 400, description = "Invalid input", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn create_announcement_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    ValidJson(mut body): ValidJson<NewAnnouncement>,
) -> Result<(StatusCode, Json<Announcement>), ResponseError> {
    body.created_by = user.id;
    let announcement = state.db.create_announcement(body).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    put,
    path = "/api/admin/announcements/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Announcement id")),
    request_body = UpdateAnnouncement,
    responses(
        (status = 200, description = "Announcement updated", body = Announcement),
        (status = 404, description = "Announcement not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn update_announcement_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ValidJson(body): ValidJson<UpdateAnnouncement>,
) -> Result<Json<Announcement>, ResponseError> {
    match state.db.update_announcement(id, body).await? {
        Some(announcement) => Ok(Json(announcement)),
        None => Err(ResponseError::NotFound(
            "Announcement not found".to_string(),
        )),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/announcements/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Announcement id")),
    responses(
        (status = 200, description = "Announcement deleted", body = crate::response::MessageResponse),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn delete_announcement_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ResponseResult, ResponseError> {
    state.db.delete_announcement(id).await?;

    Ok(ResponseResult::Message(
        "Announcement deleted successfully".to_string(),
    ))
}
