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
    db::DB,
    models::{NewRating, Rating, RatingBody, User},
    response::ResponseError,
    validation::ValidJson,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub rating: Rating,
    pub average_rating: f64,
    pub rating_count: usize,
}

/// Rates a document. Rating the same document again replaces the previous value.
#[utoipa::path(
    post,
    path = "/api/documents/{id}/ratings",
    tag = "Ratings",
    params(("id" = i64, Path, description = "Document id")),
    request_body = RatingBody,
    responses(
        (status = 201, description = "Rating stored", body = RatingResponse),
        (status = 400, description = "Rating out of range", body = crate::response::ErrorBody),
        (status = 401, description = "Not authenticated", body = crate::response::ErrorBody),
        (status = 404, description = "Document not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn create_rating_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<User>,
    ValidJson(body): ValidJson<RatingBody>,
) -> Result<(StatusCode, Json<RatingResponse>), ResponseError> {
    if state.db.get_document(id).await?.is_none() {
        return Err(ResponseError::NotFound("Document not found".to_string()));
    }

    let rating = state
        .db
        .create_rating(NewRating {
            document_id: id,
            user_id: user.id,
            rating: body.rating,
        })
        .await?;
    let average_rating = state.db.average_rating(id).await?;
    let rating_count = state.db.list_ratings_by_document(id).await?.len();

    Ok((
        StatusCode::CREATED,
        Json(RatingResponse {
            rating,
            average_rating,
            rating_count,
        }),
    ))
}
