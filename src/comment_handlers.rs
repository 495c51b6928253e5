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
    db::{DBType, DB},
    models::{Comment, CommentBody, NewComment, User, UserProfile},
    response::{ResponseError, ResponseResult},
    validation::ValidJson,
};

/// A comment with its author's public profile, `null` once the author is deleted.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: Option<UserProfile>,
}

impl CommentView {
    async fn load(db: &DBType, comment: Comment) -> Result<Self, ResponseError> {
        let user = db.get_user(comment.user_id).await?;
        Ok(Self {
            comment,
            user: user.as_ref().map(UserProfile::from),
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}/comments",
    tag = "Comments",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 200, description = "Comments of the document, newest first", body = [CommentView]),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn list_comments_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CommentView>>, ResponseError> {
    let comments = state.db.list_comments_by_document(id).await?;

    let mut views = Vec::with_capacity(comments.len());
    for comment in comments {
        views.push(CommentView::load(&state.db, comment).await?);
    }

    Ok(Json(views))
}

#[utoipa::path(
    post,
    path = "/api/documents/{id}/comments",
    tag = "Comments",
    params(("id" = i64, Path, description = "Document id")),
    request_body = CommentBody,
    responses(
        (status = 201, description = "Comment created", body = CommentView),
        (status = 400, description = "Invalid input", body = crate::response::ErrorBody),
        (status = 401, description = "Not authenticated", body = crate::response::ErrorBody),
        (status = 404, description = "Document not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<User>,
    ValidJson(body): ValidJson<CommentBody>,
) -> Result<(StatusCode, Json<CommentView>), ResponseError> {
    if state.db.get_document(id).await?.is_none() {
        return Err(ResponseError::NotFound("Document not found".to_string()));
    }

    let comment = state
        .db
        .create_comment(NewComment {
            document_id: id,
            user_id: user.id,
            content: body.content,
            is_admin_response: user.is_admin(),
            parent_id: body.parent_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentView {
            comment,
            user: Some(UserProfile::from(&user)),
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/admin/comments/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = crate::response::MessageResponse),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn delete_comment_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ResponseResult, ResponseError> {
    state.db.delete_comment(id).await?;

    Ok(ResponseResult::Message(
        "Comment deleted successfully".to_string(),
    ))
}
