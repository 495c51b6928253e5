pub mod map;
pub mod seed;
pub mod sqlite;

use crate::models::{
    Announcement, Comment, Document, DocumentFilter, Favorite, NewAnnouncement, NewComment,
    NewDocument, NewFavorite, NewRating, NewSetting, NewSubject, NewUser, Rating, Setting,
    Subject, UpdateAnnouncement, UpdateDocument, UpdateSubject, UpdateUser, User,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to execute query: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("unknown storage error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Data access over the eight entities.
///
/// Reads return `Ok(None)` for a missing row. Deletes return `Ok(true)` even
/// when nothing matched, callers rely on delete being idempotent.
#[allow(async_fn_in_trait)]
pub trait DB: Send + Sync {
    // User methods
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn update_user(&self, id: i64, user: UpdateUser) -> Result<Option<User>>;
    async fn delete_user(&self, id: i64) -> Result<bool>;

    // Subject methods
    async fn get_subject(&self, id: i64) -> Result<Option<Subject>>;
    async fn get_subject_by_name(&self, name: &str) -> Result<Option<Subject>>;
    async fn list_subjects(&self) -> Result<Vec<Subject>>;
    async fn create_subject(&self, subject: NewSubject) -> Result<Subject>;
    async fn update_subject(&self, id: i64, subject: UpdateSubject) -> Result<Option<Subject>>;
    async fn delete_subject(&self, id: i64) -> Result<bool>;

    // Document methods
    async fn get_document(&self, id: i64) -> Result<Option<Document>>;
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>>;
    async fn create_document(&self, document: NewDocument) -> Result<Document>;
    async fn update_document(&self, id: i64, document: UpdateDocument)
        -> Result<Option<Document>>;
    async fn delete_document(&self, id: i64) -> Result<bool>;
    async fn increment_download_count(&self, id: i64) -> Result<()>;

    // Rating methods
    async fn get_rating(&self, id: i64) -> Result<Option<Rating>>;
    async fn list_ratings_by_document(&self, document_id: i64) -> Result<Vec<Rating>>;
    async fn list_ratings_by_user(&self, user_id: i64) -> Result<Vec<Rating>>;
    /// Inserts the rating, or overwrites the value of the one the user
    /// already gave this document.
    async fn create_rating(&self, rating: NewRating) -> Result<Rating>;
    async fn update_rating(&self, id: i64, value: i32) -> Result<Option<Rating>>;
    async fn delete_rating(&self, id: i64) -> Result<bool>;
    /// Mean of all ratings of the document, 0 when it has none.
    async fn average_rating(&self, document_id: i64) -> Result<f64>;
    async fn get_user_document_rating(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Rating>>;

    // Comment methods, listings are newest first
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>>;
    async fn list_comments_by_document(&self, document_id: i64) -> Result<Vec<Comment>>;
    async fn list_comments_by_user(&self, user_id: i64) -> Result<Vec<Comment>>;
    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;
    async fn update_comment(&self, id: i64, content: String) -> Result<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> Result<bool>;

    // Favorite methods
    async fn get_favorite(&self, id: i64) -> Result<Option<Favorite>>;
    async fn list_favorites_by_user(&self, user_id: i64) -> Result<Vec<Favorite>>;
    async fn list_favorites_by_document(&self, document_id: i64) -> Result<Vec<Favorite>>;
    /// Fails with [`Error::Duplicate`] when the pair is already a favorite.
    async fn create_favorite(&self, favorite: NewFavorite) -> Result<Favorite>;
    async fn delete_favorite(&self, id: i64) -> Result<bool>;
    async fn get_favorite_by_user_and_document(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Favorite>>;

    // Announcement methods, listings are newest first
    async fn get_announcement(&self, id: i64) -> Result<Option<Announcement>>;
    async fn list_announcements(&self, active_only: bool) -> Result<Vec<Announcement>>;
    async fn create_announcement(&self, announcement: NewAnnouncement) -> Result<Announcement>;
    async fn update_announcement(
        &self,
        id: i64,
        announcement: UpdateAnnouncement,
    ) -> Result<Option<Announcement>>;
    async fn delete_announcement(&self, id: i64) -> Result<bool>;

    // Setting methods
    async fn get_setting(&self, key: &str) -> Result<Option<Setting>>;
    /// All settings when `keys` is empty.
    async fn list_settings(&self, keys: &[String]) -> Result<Vec<Setting>>;
    async fn create_setting(&self, setting: NewSetting) -> Result<Setting>;
    async fn update_setting(&self, id: i64, value: String) -> Result<Option<Setting>>;
    /// Updates the value stored under `key`, creating the entry if needed.
    async fn upsert_setting(&self, key: &str, value: String) -> Result<Setting>;
    async fn delete_setting(&self, id: i64) -> Result<bool>;
}

pub enum DBType {
    MapDB(map::MapDB),
    SqlDB(sqlite::SqlDB),
}

macro_rules! dispatch {
    ($self:ident, $db:ident => $call:expr) => {
        match $self {
            DBType::MapDB($db) => $call,
            DBType::SqlDB($db) => $call,
        }
    };
}

impl DB for DBType {
    // User methods
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        dispatch!(self, db => db.get_user(id).await)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        dispatch!(self, db => db.get_user_by_username(username).await)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        dispatch!(self, db => db.get_user_by_email(email).await)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        dispatch!(self, db => db.list_users().await)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        dispatch!(self, db => db.create_user(user).await)
    }

    async fn update_user(&self, id: i64, user: UpdateUser) -> Result<Option<User>> {
        dispatch!(self, db => db.update_user(id, user).await)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_user(id).await)
    }

    // Subject methods
    async fn get_subject(&self, id: i64) -> Result<Option<Subject>> {
        dispatch!(self, db => db.get_subject(id).await)
    }

    async fn get_subject_by_name(&self, name: &str) -> Result<Option<Subject>> {
        dispatch!(self, db => db.get_subject_by_name(name).await)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        dispatch!(self, db => db.list_subjects().await)
    }

    async fn create_subject(&self, subject: NewSubject) -> Result<Subject> {
        dispatch!(self, db => db.create_subject(subject).await)
    }

    async fn update_subject(&self, id: i64, subject: UpdateSubject) -> Result<Option<Subject>> {
        dispatch!(self, db => db.update_subject(id, subject).await)
    }

    async fn delete_subject(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_subject(id).await)
    }

    // Document methods
    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        dispatch!(self, db => db.get_document(id).await)
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        dispatch!(self, db => db.list_documents(filter).await)
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        dispatch!(self, db => db.create_document(document).await)
    }

    async fn update_document(
        &self,
        id: i64,
        document: UpdateDocument,
    ) -> Result<Option<Document>> {
        dispatch!(self, db => db.update_document(id, document).await)
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_document(id).await)
    }

    async fn increment_download_count(&self, id: i64) -> Result<()> {
        dispatch!(self, db => db.increment_download_count(id).await)
    }

    // Rating methods
    async fn get_rating(&self, id: i64) -> Result<Option<Rating>> {
        dispatch!(self, db => db.get_rating(id).await)
    }

    async fn list_ratings_by_document(&self, document_id: i64) -> Result<Vec<Rating>> {
        dispatch!(self, db => db.list_ratings_by_document(document_id).await)
    }

    async fn list_ratings_by_user(&self, user_id: i64) -> Result<Vec<Rating>> {
        dispatch!(self, db => db.list_ratings_by_user(user_id).await)
    }

    async fn create_rating(&self, rating: NewRating) -> Result<Rating> {
        dispatch!(self, db => db.create_rating(rating).await)
    }

    async fn update_rating(&self, id: i64, value: i32) -> Result<Option<Rating>> {
        dispatch!(self, db => db.update_rating(id, value).await)
    }

    async fn delete_rating(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_rating(id).await)
    }

    async fn average_rating(&self, document_id: i64) -> Result<f64> {
        dispatch!(self, db => db.average_rating(document_id).await)
    }

    async fn get_user_document_rating(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Rating>> {
        dispatch!(self, db => db.get_user_document_rating(user_id, document_id).await)
    }

    // Comment methods
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        dispatch!(self, db => db.get_comment(id).await)
    }

    async fn list_comments_by_document(&self, document_id: i64) -> Result<Vec<Comment>> {
        dispatch!(self, db => db.list_comments_by_document(document_id).await)
    }

    async fn list_comments_by_user(&self, user_id: i64) -> Result<Vec<Comment>> {
        dispatch!(self, db => db.list_comments_by_user(user_id).await)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        dispatch!(self, db => db.create_comment(comment).await)
    }

    async fn update_comment(&self, id: i64, content: String) -> Result<Option<Comment>> {
        dispatch!(self, db => db.update_comment(id, content).await)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_comment(id).await)
    }

    // Favorite methods
    async fn get_favorite(&self, id: i64) -> Result<Option<Favorite>> {
        dispatch!(self, db => db.get_favorite(id).await)
    }

    async fn list_favorites_by_user(&self, user_id: i64) -> Result<Vec<Favorite>> {
        dispatch!(self, db => db.list_favorites_by_user(user_id).await)
    }

    async fn list_favorites_by_document(&self, document_id: i64) -> Result<Vec<Favorite>> {
        dispatch!(self, db => db.list_favorites_by_document(document_id).await)
    }

    async fn create_favorite(&self, favorite: NewFavorite) -> Result<Favorite> {
        dispatch!(self, db => db.create_favorite(favorite).await)
    }

    async fn delete_favorite(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_favorite(id).await)
    }

    async fn get_favorite_by_user_and_document(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Favorite>> {
        dispatch!(self, db => db.get_favorite_by_user_and_document(user_id, document_id).await)
    }

    // Announcement methods
    async fn get_announcement(&self, id: i64) -> Result<Option<Announcement>> {
        dispatch!(self, db => db.get_announcement(id).await)
    }

    async fn list_announcements(&self, active_only: bool) -> Result<Vec<Announcement>> {
        dispatch!(self, db => db.list_announcements(active_only).await)
    }

    async fn create_announcement(&self, announcement: NewAnnouncement) -> Result<Announcement> {
        dispatch!(self, db => db.create_announcement(announcement).await)
    }

    async fn update_announcement(
        &self,
        id: i64,
        announcement: UpdateAnnouncement,
    ) -> Result<Option<Announcement>> {
        dispatch!(self, db => db.update_announcement(id, announcement).await)
    }

    async fn delete_announcement(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_announcement(id).await)
    }

    // Setting methods
    async fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        dispatch!(self, db => db.get_setting(key).await)
    }

    async fn list_settings(&self, keys: &[String]) -> Result<Vec<Setting>> {
        dispatch!(self, db => db.list_settings(keys).await)
    }

    async fn create_setting(&self, setting: NewSetting) -> Result<Setting> {
        dispatch!(self, db => db.create_setting(setting).await)
    }

    async fn update_setting(&self, id: i64, value: String) -> Result<Option<Setting>> {
        dispatch!(self, db => db.update_setting(id, value).await)
    }

    async fn upsert_setting(&self, key: &str, value: String) -> Result<Setting> {
        dispatch!(self, db => db.upsert_setting(key, value).await)
    }

    async fn delete_setting(&self, id: i64) -> Result<bool> {
        dispatch!(self, db => db.delete_setting(id).await)
    }
}
