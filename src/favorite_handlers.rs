use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_macros::debug_handler;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::AppState,
    db::{self, DB},
    document_handlers::SubjectDocument,
    models::{Favorite, NewFavorite, User},
    response::{ResponseError, ResponseResult},
};

const ALREADY_FAVORITED: &str = "Document already favorited";

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteView {
    #[serde(flatten)]
    pub favorite: Favorite,
    /// `null` once the document is deleted
    pub document: Option<SubjectDocument>,
}

#[utoipa::path(
    get,
    path = "/api/favorites",
    tag = "Favorites",
    responses(
        (status = 200, description = "The caller's favorites", body = [FavoriteView]),
        (status = 401, description = "Not authenticated", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn list_favorites_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<FavoriteView>>, ResponseError> {
    let favorites = state.db.list_favorites_by_user(user.id).await?;

    let mut views = Vec::with_capacity(favorites.len());
    for favorite in favorites {
        let document = match state.db.get_document(favorite.document_id).await? {
            Some(document) => Some(SubjectDocument::load(&state.db, document).await?),
            None => None,
        };
        views.push(FavoriteView { favorite, document });
    }

    Ok(Json(views))
}

#[utoipa::path(
    post,
    path = "/api/documents/{id}/favorites",
    tag = "Favorites",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 201, description = "Document added to favorites", body = Favorite),
        (status = 400, description = "Document already favorited", body = crate::response::ErrorBody),
        (status = 401, description = "Not authenticated", body = crate::response::ErrorBody),
        (status = 404, description = "Document not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn add_favorite_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<User>,
) -> Result<(StatusCode, Json<Favorite>), ResponseError> {
    if state.db.get_document(id).await?.is_none() {
        return Err(ResponseError::NotFound("Document not found".to_string()));
    }

    if state
        .db
        .get_favorite_by_user_and_document(user.id, id)
        .await?
        .is_some()
    {
        return Err(ResponseError::BadRequest(ALREADY_FAVORITED.to_string()));
    }

    // a concurrent request can still win between the check and the insert
    let favorite = state
        .db
        .create_favorite(NewFavorite {
            document_id: id,
            user_id: user.id,
        })
        .await
        .map_err(|err| match err {
            db::Error::Duplicate(_) => ResponseError::BadRequest(ALREADY_FAVORITED.to_string()),
            err => err.into(),
        })?;

    Ok((StatusCode::CREATED, Json(favorite)))
}

#[utoipa::path(
    delete,
    path = "/api/documents/{id}/favorites",
    tag = "Favorites",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 200, description = "Favorite removed", body = crate::response::MessageResponse),
        (status = 401, description = "Not authenticated", body = crate::response::ErrorBody),
        (status = 404, description = "Favorite not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn remove_favorite_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<User>,
) -> Result<ResponseResult, ResponseError> {
    let favorite = match state
        .db
        .get_favorite_by_user_and_document(user.id, id)
        .await?
    {
        Some(favorite) => favorite,
        None => return Err(ResponseError::NotFound("Favorite not found".to_string())),
    };
    state.db.delete_favorite(favorite.id).await?;

    Ok(ResponseResult::Message(
        "Favorite removed successfully".to_string(),
    ))
}
