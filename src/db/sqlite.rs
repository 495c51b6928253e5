use std::str::FromStr;

use chrono::Utc;
use sqlx::{
    query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};

use super::{Error, Result, DB};
use crate::models::{
    Announcement, Comment, Document, DocumentFilter, Favorite, NewAnnouncement, NewComment,
    NewDocument, NewFavorite, NewRating, NewSetting, NewSubject, NewUser, Rating, Setting,
    Subject, UpdateAnnouncement, UpdateDocument, UpdateSubject, UpdateUser, User,
};

/// Path that opens a private in-memory database.
pub const MEMORY: &str = ":memory:";

static SCHEMA: &str = include_str!("../../schema/schema.sql");

#[derive(Debug)]
pub struct SqlDB {
    pool: SqlitePool,
}

impl SqlDB {
    pub async fn new(database_filepath: &str) -> Result<Self> {
        let pool = if database_filepath == MEMORY {
            // every connection would see its own empty database, keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                .await?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(database_filepath)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);
            SqlitePoolOptions::new().connect_with(options).await?
        };

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Initialize the database schema
    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        query(SCHEMA).execute(pool).await?;

        log::info!("Database schema initialized successfully");
        Ok(())
    }
}

fn unique(what: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |err| match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Error::Duplicate(what),
        err => Error::SqlError(err),
    }
}

impl DB for SqlDB {
    // User methods
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        query_as::<_, User>(
            "INSERT INTO users (username, password, email, full_name, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user.username)
        .bind(user.password)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unique("user"))
    }

    async fn update_user(&self, id: i64, user: UpdateUser) -> Result<Option<User>> {
        query_as::<_, User>(
            "UPDATE users SET
                email = COALESCE(?, email),
                full_name = COALESCE(?, full_name),
                role = COALESCE(?, role),
                password = COALESCE(?, password)
             WHERE id = ? RETURNING *",
        )
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.role)
        .bind(user.password)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unique("user"))
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    // Subject methods
    async fn get_subject(&self, id: i64) -> Result<Option<Subject>> {
        Ok(query_as::<_, Subject>("SELECT * FROM subjects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_subject_by_name(&self, name: &str) -> Result<Option<Subject>> {
        Ok(query_as::<_, Subject>("SELECT * FROM subjects WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        Ok(query_as::<_, Subject>("SELECT * FROM subjects ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_subject(&self, subject: NewSubject) -> Result<Subject> {
        query_as::<_, Subject>("INSERT INTO subjects (name, color) VALUES (?, ?) RETURNING *")
            .bind(subject.name)
            .bind(subject.color)
            .fetch_one(&self.pool)
            .await
            .map_err(unique("subject"))
    }

    async fn update_subject(&self, id: i64, subject: UpdateSubject) -> Result<Option<Subject>> {
        query_as::<_, Subject>(
            "UPDATE subjects SET name = COALESCE(?, name), color = COALESCE(?, color)
             WHERE id = ? RETURNING *",
        )
        .bind(subject.name)
        .bind(subject.color)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unique("subject"))
    }

    async fn delete_subject(&self, id: i64) -> Result<bool> {
        query("DELETE FROM subjects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    // Document methods
    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        Ok(query_as::<_, Document>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM documents WHERE 1 = 1");

        if let Some(subject_id) = filter.subject_id {
            builder.push(" AND subject_id = ").push_bind(subject_id);
        }
        if let Some(year) = filter.year {
            builder.push(" AND year = ").push_bind(year);
        }
        builder.push(" ORDER BY id");

        // LOWER() and LIKE only fold ASCII, search is matched on the Rust side
        let documents = builder
            .build_query_as::<Document>()
            .fetch_all(&self.pool)
            .await?;
        Ok(documents
            .into_iter()
            .filter(|document| filter.matches(document))
            .collect())
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        Ok(query_as::<_, Document>(
            "INSERT INTO documents
                (title, description, year, subject_id, file_name, file_size, uploaded_by, downloads, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?) RETURNING *",
        )
        .bind(document.title)
        .bind(document.description)
        .bind(document.year)
        .bind(document.subject_id)
        .bind(document.file_name)
        .bind(document.file_size)
        .bind(document.uploaded_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_document(
        &self,
        id: i64,
        document: UpdateDocument,
    ) -> Result<Option<Document>> {
        Ok(query_as::<_, Document>(
            "UPDATE documents SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                year = COALESCE(?, year),
                subject_id = COALESCE(?, subject_id),
                file_name = COALESCE(?, file_name),
                file_size = COALESCE(?, file_size)
             WHERE id = ? RETURNING *",
        )
        .bind(document.title)
        .bind(document.description)
        .bind(document.year)
        .bind(document.subject_id)
        .bind(document.file_name)
        .bind(document.file_size)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn increment_download_count(&self, id: i64) -> Result<()> {
        query("UPDATE documents SET downloads = downloads + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Rating methods
    async fn get_rating(&self, id: i64) -> Result<Option<Rating>> {
        Ok(query_as::<_, Rating>("SELECT * FROM ratings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_ratings_by_document(&self, document_id: i64) -> Result<Vec<Rating>> {
        Ok(
            query_as::<_, Rating>("SELECT * FROM ratings WHERE document_id = ? ORDER BY id")
                .bind(document_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_ratings_by_user(&self, user_id: i64) -> Result<Vec<Rating>> {
        Ok(
            query_as::<_, Rating>("SELECT * FROM ratings WHERE user_id = ? ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_rating(&self, rating: NewRating) -> Result<Rating> {
        Ok(query_as::<_, Rating>(
            "INSERT INTO ratings (document_id, user_id, rating, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, document_id) DO UPDATE SET rating = excluded.rating
             RETURNING *",
        )
        .bind(rating.document_id)
        .bind(rating.user_id)
        .bind(rating.rating)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_rating(&self, id: i64, value: i32) -> Result<Option<Rating>> {
        Ok(
            query_as::<_, Rating>("UPDATE ratings SET rating = ? WHERE id = ? RETURNING *")
                .bind(value)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn delete_rating(&self, id: i64) -> Result<bool> {
        query("DELETE FROM ratings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn average_rating(&self, document_id: i64) -> Result<f64> {
        let average: Option<f64> =
            query_scalar("SELECT AVG(rating) FROM ratings WHERE document_id = ?")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(average.unwrap_or(0.0))
    }

    async fn get_user_document_rating(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Rating>> {
        Ok(query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE user_id = ? AND document_id = ?",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    // Comment methods
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_comments_by_document(&self, document_id: i64) -> Result<Vec<Comment>> {
        Ok(query_as::<_, Comment>(
            "SELECT * FROM comments WHERE document_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_comments_by_user(&self, user_id: i64) -> Result<Vec<Comment>> {
        Ok(query_as::<_, Comment>(
            "SELECT * FROM comments WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        Ok(query_as::<_, Comment>(
            "INSERT INTO comments (document_id, user_id, content, is_admin_response, parent_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(comment.document_id)
        .bind(comment.user_id)
        .bind(comment.content)
        .bind(comment.is_admin_response)
        .bind(comment.parent_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_comment(&self, id: i64, content: String) -> Result<Option<Comment>> {
        Ok(
            query_as::<_, Comment>("UPDATE comments SET content = ? WHERE id = ? RETURNING *")
                .bind(content)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    // Favorite methods
    async fn get_favorite(&self, id: i64) -> Result<Option<Favorite>> {
        Ok(query_as::<_, Favorite>("SELECT * FROM favorites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_favorites_by_user(&self, user_id: i64) -> Result<Vec<Favorite>> {
        Ok(
            query_as::<_, Favorite>("SELECT * FROM favorites WHERE user_id = ? ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_favorites_by_document(&self, document_id: i64) -> Result<Vec<Favorite>> {
        Ok(
            query_as::<_, Favorite>("SELECT * FROM favorites WHERE document_id = ? ORDER BY id")
                .bind(document_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn create_favorite(&self, favorite: NewFavorite) -> Result<Favorite> {
        query_as::<_, Favorite>(
            "INSERT INTO favorites (document_id, user_id, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(favorite.document_id)
        .bind(favorite.user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unique("favorite"))
    }

    async fn delete_favorite(&self, id: i64) -> Result<bool> {
        query("DELETE FROM favorites WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn get_favorite_by_user_and_document(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Favorite>> {
        Ok(query_as::<_, Favorite>(
            "SELECT * FROM favorites WHERE user_id = ? AND document_id = ?",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    // Announcement methods
    async fn get_announcement(&self, id: i64) -> Result<Option<Announcement>> {
        Ok(query_as::<_, Announcement>("SELECT * FROM announcements WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_announcements(&self, active_only: bool) -> Result<Vec<Announcement>> {
        Ok(query_as::<_, Announcement>(
            "SELECT * FROM announcements WHERE active = 1 OR ? = 0
             ORDER BY created_at DESC, id DESC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_announcement(&self, announcement: NewAnnouncement) -> Result<Announcement> {
        Ok(query_as::<_, Announcement>(
            "INSERT INTO announcements (title, content, active, created_at, created_by)
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(announcement.title)
        .bind(announcement.content)
        .bind(announcement.active)
        .bind(Utc::now())
        .bind(announcement.created_by)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_announcement(
        &self,
        id: i64,
        announcement: UpdateAnnouncement,
    ) -> Result<Option<Announcement>> {
        Ok(query_as::<_, Announcement>(
            "UPDATE announcements SET
                title = COALESCE(?, title),
                content = COALESCE(?, content),
                active = COALESCE(?, active)
             WHERE id = ? RETURNING *",
        )
        .bind(announcement.title)
        .bind(announcement.content)
        .bind(announcement.active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_announcement(&self, id: i64) -> Result<bool> {
        query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    // Setting methods
    async fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        Ok(query_as::<_, Setting>("SELECT * FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_settings(&self, keys: &[String]) -> Result<Vec<Setting>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM settings");
        if !keys.is_empty() {
            builder.push(" WHERE key IN (");
            let mut separated = builder.separated(", ");
            for key in keys {
                separated.push_bind(key.as_str());
            }
            separated.push_unseparated(")");
        }
        builder.push(" ORDER BY id");

        Ok(builder
            .build_query_as::<Setting>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_setting(&self, setting: NewSetting) -> Result<Setting> {
        query_as::<_, Setting>(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(setting.key)
        .bind(setting.value)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unique("setting"))
    }

    async fn update_setting(&self, id: i64, value: String) -> Result<Option<Setting>> {
        Ok(query_as::<_, Setting>(
            "UPDATE settings SET value = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(value)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_setting(&self, key: &str, value: String) -> Result<Setting> {
        Ok(query_as::<_, Setting>(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
             RETURNING *",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_setting(&self, id: i64) -> Result<bool> {
        query("DELETE FROM settings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }
}
