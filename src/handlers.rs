use axum::response::IntoResponse;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    admin_handlers, announcement_handlers, auth, comment_handlers, document_handlers,
    favorite_handlers, models, rating_handlers,
    response::{ErrorBody, MessageResponse, ResponseResult},
    setting_handlers, subject_handlers,
    validation::FieldError,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_handler,
        auth::register_handler, auth::sign_in_handler, auth::sign_out_handler, auth::current_user_handler,
        subject_handlers::list_subjects_handler, subject_handlers::get_subject_handler,
        document_handlers::list_documents_handler, document_handlers::get_document_handler, document_handlers::download_document_handler,
        comment_handlers::list_comments_handler, comment_handlers::create_comment_handler,
        rating_handlers::create_rating_handler,
        favorite_handlers::list_favorites_handler, favorite_handlers::add_favorite_handler, favorite_handlers::remove_favorite_handler,
        announcement_handlers::list_announcements_handler,
        setting_handlers::list_settings_handler,
        admin_handlers::list_users_handler, admin_handlers::update_user_handler, admin_handlers::delete_user_handler, admin_handlers::stats_handler,
        document_handlers::create_document_handler, document_handlers::update_document_handler, document_handlers::delete_document_handler,
        subject_handlers::create_subject_handler, subject_handlers::update_subject_handler, subject_handlers::delete_subject_handler,
        announcement_handlers::create_announcement_handler, announcement_handlers::update_announcement_handler, announcement_handlers::delete_announcement_handler,
        setting_handlers::upsert_setting_handler, setting_handlers::delete_setting_handler,
        comment_handlers::delete_comment_handler,
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            // Common schemas
            ErrorBody, MessageResponse, FieldError,
            // Authentication schemas
            auth::SignInBody, auth::SignInResponse, auth::RegisterBody,
            // Entity schemas
            models::User, models::Role, models::UserProfile, models::UpdateUser,
            models::Subject, models::NewSubject, models::UpdateSubject,
            models::Document, models::NewDocument, models::UpdateDocument,
            models::Rating, models::RatingBody,
            models::Comment, models::CommentBody,
            models::Favorite,
            models::Announcement, models::NewAnnouncement, models::UpdateAnnouncement,
            models::Setting, models::NewSetting,
            // Composite views
            document_handlers::SubjectDocument, document_handlers::DocumentSummary, document_handlers::DocumentDetail,
            document_handlers::DownloadInfo, document_handlers::DownloadResponse,
            comment_handlers::CommentView, rating_handlers::RatingResponse, favorite_handlers::FavoriteView,
            admin_handlers::StatsDocument, admin_handlers::StatsResponse,
        )
    ),
    tags(
        (name = "System", description = "System health and status"),
        (name = "Authentication", description = "Accounts and sessions"),
        (name = "Subjects", description = "Exam subjects"),
        (name = "Documents", description = "Browsing and downloading documents"),
        (name = "Comments", description = "Discussion under documents"),
        (name = "Ratings", description = "Document ratings"),
        (name = "Favorites", description = "Personal favorites"),
        (name = "Announcements", description = "Site announcements"),
        (name = "Settings", description = "Footer and contact configuration"),
        (name = "Admin", description = "Administration, admin role required"),
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/api",
    tag = "System",
    responses(
        (status = 200, description = "Server is running"),
    )
)]
pub async fn health_check_handler() -> impl IntoResponse {
    ResponseResult::Health
}
