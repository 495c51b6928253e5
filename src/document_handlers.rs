use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use axum_macros::debug_handler;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::AppState,
    db::{DBType, DB},
    models::{
        Document, DocumentFilter, DocumentQuery, NewDocument, Subject, UpdateDocument, User,
    },
    response::{ResponseError, ResponseResult},
    validation::ValidJson,
};

const UNKNOWN_SUBJECT: &str = "Unknown";
const UNKNOWN_SUBJECT_COLOR: &str = "gray";

/// A document with the name and color of its subject.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDocument {
    #[serde(flatten)]
    pub document: Document,
    pub subject: String,
    pub subject_color: String,
}

impl SubjectDocument {
    pub fn new(document: Document, subject: Option<Subject>) -> Self {
        let (subject, subject_color) = match subject {
            Some(subject) => (subject.name, subject.color),
            None => (
                UNKNOWN_SUBJECT.to_string(),
                UNKNOWN_SUBJECT_COLOR.to_string(),
            ),
        };

        Self {
            document,
            subject,
            subject_color,
        }
    }

    pub async fn load(db: &DBType, document: Document) -> Result<Self, ResponseError> {
        let subject = db.get_subject(document.subject_id).await?;
        Ok(Self::new(document, subject))
    }
}

/// Listing entry: the document, its subject and aggregates computed on read.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[serde(flatten)]
    pub document: SubjectDocument,
    pub average_rating: f64,
    pub rating_count: usize,
    pub comment_count: usize,
}

impl DocumentSummary {
    async fn load(db: &DBType, document: Document) -> Result<Self, ResponseError> {
        let ratings = db.list_ratings_by_document(document.id).await?;
        let average_rating = db.average_rating(document.id).await?;
        let comment_count = db.list_comments_by_document(document.id).await?.len();

        Ok(Self {
            document: SubjectDocument::load(db, document).await?,
            average_rating,
            rating_count: ratings.len(),
            comment_count,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    /// false for anonymous callers
    pub is_favorite: bool,
    /// the caller's rating, 0 when none or anonymous
    pub user_rating: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    pub id: i64,
    pub title: String,
    pub file_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    pub message: String,
    pub document: DownloadInfo,
}

async fn find_document(db: &DBType, id: i64) -> Result<Document, ResponseError> {
    db.get_document(id)
        .await?
        .ok_or_else(|| ResponseError::NotFound("Document not found".to_string()))
}

async fn check_subject(db: &DBType, subject_id: i64) -> Result<(), ResponseError> {
    match db.get_subject(subject_id).await? {
        Some(_) => Ok(()),
        None => Err(ResponseError::BadRequest("Subject not found".to_string())),
    }
}

#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "Documents",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Documents matching the filters", body = [DocumentSummary]),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<DocumentSummary>>, ResponseError> {
    let filter = DocumentFilter::from(query);
    let documents = state.db.list_documents(&filter).await?;

    let mut summaries = Vec::with_capacity(documents.len());
    for document in documents {
        summaries.push(DocumentSummary::load(&state.db, document).await?);
    }

    Ok(Json(summaries))
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    tag = "Documents",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document found", body = DocumentDetail),
        (status = 404, description = "Document not found", body = crate::response::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    user: Option<Extension<User>>,
) -> Result<Json<DocumentDetail>, ResponseError> {
    let document = find_document(&state.db, id).await?;

    let (is_favorite, user_rating) = match user {
        Some(Extension(user)) => {
            let favorite = state
                .db
                .get_favorite_by_user_and_document(user.id, id)
                .await?;
            let rating = state.db.get_user_document_rating(user.id, id).await?;
            (favorite.is_some(), rating.map(|r| r.rating).unwrap_or(0))
        }
        None => (false, 0),
    };

    Ok(Json(DocumentDetail {
        summary: DocumentSummary::load(&state.db, document).await?,
        is_favorite,
        user_rating,
    }))
}

/// No bytes are transferred, the counter is bumped and metadata returned.
#[utoipa::path(
    get,
    path = "/api/documents/{id}/download",
    tag = "Documents",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 200, description = "Download started", body = DownloadResponse),
        (status = 401, description = "Not authenticated", body = crate::response::ErrorBody),
        (status = 404, description = "Document not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn download_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Extension(user): Extension<User>,
) -> Result<Json<DownloadResponse>, ResponseError> {
    let document = find_document(&state.db, id).await?;
    state.db.increment_download_count(id).await?;
    log::debug!("user '{}' downloaded document {}", user.username, id);

    Ok(Json(DownloadResponse {
        message: "Download started".to_string(),
        document: DownloadInfo {
            id: document.id,
            title: document.title,
            file_name: document.file_name,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/documents",
    tag = "Admin",
    request_body = NewDocument,
    responses(
        (status = 201, description = "Document created", body = Document),
        (status = 400, description = "Invalid input or unknown subject", body = crate::response::ErrorBody),
        (status = 403, description = "Admin access required", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn create_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    ValidJson(mut body): ValidJson<NewDocument>,
) -> Result<(StatusCode, Json<Document>), ResponseError> {
    check_subject(&state.db, body.subject_id).await?;

    body.uploaded_by = user.id;
    let document = state.db.create_document(body).await?;
    log::info!("document {} created by '{}'", document.id, user.username);

    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    put,
    path = "/api/admin/documents/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Document id")),
    request_body = UpdateDocument,
    responses(
        (status = 200, description = "Document updated", body = Document),
        (status = 400, description = "Invalid input or unknown subject", body = crate::response::ErrorBody),
        (status = 404, description = "Document not found", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn update_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    ValidJson(body): ValidJson<UpdateDocument>,
) -> Result<Json<Document>, ResponseError> {
    if let Some(subject_id) = body.subject_id {
        check_subject(&state.db, subject_id).await?;
    }

    match state.db.update_document(id, body).await? {
        Some(document) => Ok(Json(document)),
        None => Err(ResponseError::NotFound("Document not found".to_string())),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/documents/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document deleted", body = crate::response::MessageResponse),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ResponseResult, ResponseError> {
    state.db.delete_document(id).await?;

    Ok(ResponseResult::Message(
        "Document deleted successfully".to_string(),
    ))
}
