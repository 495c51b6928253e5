use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::{Error, Result, DB};
use crate::models::{
    Announcement, Comment, Document, DocumentFilter, Favorite, NewAnnouncement, NewComment,
    NewDocument, NewFavorite, NewRating, NewSetting, NewSubject, NewUser, Rating, Setting,
    Subject, UpdateAnnouncement, UpdateDocument, UpdateSubject, UpdateUser, User,
};

/// Rows keyed by id, ids are never reused.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T: Clone> Table<T> {
    fn insert_with<F: FnOnce(i64) -> T>(&mut self, make: F) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = make(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn find<P: Fn(&T) -> bool>(&self, predicate: P) -> Option<T> {
        self.rows.values().find(|row| predicate(row)).cloned()
    }

    fn filter<P: Fn(&T) -> bool>(&self, predicate: P) -> Vec<T> {
        self.rows
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    fn any<P: Fn(&T) -> bool>(&self, predicate: P) -> bool {
        self.rows.values().any(predicate)
    }

    fn update<F: FnOnce(&mut T)>(&mut self, id: i64, apply: F) -> Option<T> {
        let row = self.rows.get_mut(&id)?;
        apply(row);
        Some(row.clone())
    }

    fn remove(&mut self, id: i64) -> bool {
        self.rows.remove(&id);
        true
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<User>,
    subjects: Table<Subject>,
    documents: Table<Document>,
    ratings: Table<Rating>,
    comments: Table<Comment>,
    favorites: Table<Favorite>,
    announcements: Table<Announcement>,
    settings: Table<Setting>,
}

/// In-memory store. Every operation runs under a single lock, so
/// check-then-write sequences (rating upsert, favorite uniqueness) are atomic.
#[derive(Debug, Default)]
pub struct MapDB {
    tables: Mutex<Tables>,
}

impl MapDB {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn newest_first<T, F: Fn(&T) -> (chrono::DateTime<Utc>, i64)>(rows: &mut [T], key: F) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

impl DB for MapDB {
    // User methods
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.lock().users.get(id))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.lock().users.find(|u| u.username == username))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.lock().users.find(|u| u.email == email))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.lock().users.filter(|_| true))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.lock();
        if tables
            .users
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(Error::Duplicate("user"));
        }

        Ok(tables.users.insert_with(|id| User {
            id,
            username: user.username,
            password: user.password,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            created_at: Utc::now(),
        }))
    }

    async fn update_user(&self, id: i64, user: UpdateUser) -> Result<Option<User>> {
        let mut tables = self.lock();
        if let Some(email) = &user.email {
            if tables.users.any(|u| u.id != id && &u.email == email) {
                return Err(Error::Duplicate("user"));
            }
        }

        Ok(tables.users.update(id, |row| {
            if let Some(email) = user.email {
                row.email = email;
            }
            if let Some(full_name) = user.full_name {
                row.full_name = full_name;
            }
            if let Some(role) = user.role {
                row.role = role;
            }
            if let Some(password) = user.password {
                row.password = password;
            }
        }))
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        Ok(self.lock().users.remove(id))
    }

    // Subject methods
    async fn get_subject(&self, id: i64) -> Result<Option<Subject>> {
        Ok(self.lock().subjects.get(id))
    }

    async fn get_subject_by_name(&self, name: &str) -> Result<Option<Subject>> {
        Ok(self.lock().subjects.find(|s| s.name == name))
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.lock().subjects.filter(|_| true))
    }

    async fn create_subject(&self, subject: NewSubject) -> Result<Subject> {
        let mut tables = self.lock();
        if tables.subjects.any(|s| s.name == subject.name) {
            return Err(Error::Duplicate("subject"));
        }

        Ok(tables.subjects.insert_with(|id| Subject {
            id,
            name: subject.name,
            color: subject.color,
        }))
    }

    async fn update_subject(&self, id: i64, subject: UpdateSubject) -> Result<Option<Subject>> {
        let mut tables = self.lock();
        if let Some(name) = &subject.name {
            if tables.subjects.any(|s| s.id != id && &s.name == name) {
                return Err(Error::Duplicate("subject"));
            }
        }

        Ok(tables.subjects.update(id, |row| {
            if let Some(name) = subject.name {
                row.name = name;
            }
            if let Some(color) = subject.color {
                row.color = color;
            }
        }))
    }

    async fn delete_subject(&self, id: i64) -> Result<bool> {
        Ok(self.lock().subjects.remove(id))
    }

    // Document methods
    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        Ok(self.lock().documents.get(id))
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
        Ok(self.lock().documents.filter(|d| filter.matches(d)))
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        Ok(self.lock().documents.insert_with(|id| Document {
            id,
            title: document.title,
            description: document.description,
            year: document.year,
            subject_id: document.subject_id,
            file_name: document.file_name,
            file_size: document.file_size,
            uploaded_by: document.uploaded_by,
            downloads: 0,
            created_at: Utc::now(),
        }))
    }

    async fn update_document(
        &self,
        id: i64,
        document: UpdateDocument,
    ) -> Result<Option<Document>> {
        Ok(self.lock().documents.update(id, |row| {
            if let Some(title) = document.title {
                row.title = title;
            }
            if let Some(description) = document.description {
                row.description = description;
            }
            if let Some(year) = document.year {
                row.year = year;
            }
            if let Some(subject_id) = document.subject_id {
                row.subject_id = subject_id;
            }
            if let Some(file_name) = document.file_name {
                row.file_name = file_name;
            }
            if let Some(file_size) = document.file_size {
                row.file_size = file_size;
            }
        }))
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        Ok(self.lock().documents.remove(id))
    }

    async fn increment_download_count(&self, id: i64) -> Result<()> {
        self.lock().documents.update(id, |row| row.downloads += 1);
        Ok(())
    }

    // Rating methods
    async fn get_rating(&self, id: i64) -> Result<Option<Rating>> {
        Ok(self.lock().ratings.get(id))
    }

    async fn list_ratings_by_document(&self, document_id: i64) -> Result<Vec<Rating>> {
        Ok(self.lock().ratings.filter(|r| r.document_id == document_id))
    }

    async fn list_ratings_by_user(&self, user_id: i64) -> Result<Vec<Rating>> {
        Ok(self.lock().ratings.filter(|r| r.user_id == user_id))
    }

    async fn create_rating(&self, rating: NewRating) -> Result<Rating> {
        let mut tables = self.lock();
        let existing = tables
            .ratings
            .find(|r| r.user_id == rating.user_id && r.document_id == rating.document_id);

        if let Some(existing) = existing {
            if let Some(updated) = tables
                .ratings
                .update(existing.id, |row| row.rating = rating.rating)
            {
                return Ok(updated);
            }
        }

        Ok(tables.ratings.insert_with(|id| Rating {
            id,
            document_id: rating.document_id,
            user_id: rating.user_id,
            rating: rating.rating,
            created_at: Utc::now(),
        }))
    }

    async fn update_rating(&self, id: i64, value: i32) -> Result<Option<Rating>> {
        Ok(self.lock().ratings.update(id, |row| row.rating = value))
    }

    async fn delete_rating(&self, id: i64) -> Result<bool> {
        Ok(self.lock().ratings.remove(id))
    }

    async fn average_rating(&self, document_id: i64) -> Result<f64> {
        let ratings = self.lock().ratings.filter(|r| r.document_id == document_id);
        if ratings.is_empty() {
            return Ok(0.0);
        }

        let sum: i64 = ratings.iter().map(|r| r.rating as i64).sum();
        Ok(sum as f64 / ratings.len() as f64)
    }

    async fn get_user_document_rating(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Rating>> {
        Ok(self
            .lock()
            .ratings
            .find(|r| r.user_id == user_id && r.document_id == document_id))
    }

    // Comment methods
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.lock().comments.get(id))
    }

    async fn list_comments_by_document(&self, document_id: i64) -> Result<Vec<Comment>> {
        let mut comments = self.lock().comments.filter(|c| c.document_id == document_id);
        newest_first(&mut comments, |c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn list_comments_by_user(&self, user_id: i64) -> Result<Vec<Comment>> {
        let mut comments = self.lock().comments.filter(|c| c.user_id == user_id);
        newest_first(&mut comments, |c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        Ok(self.lock().comments.insert_with(|id| Comment {
            id,
            document_id: comment.document_id,
            user_id: comment.user_id,
            content: comment.content,
            is_admin_response: comment.is_admin_response,
            parent_id: comment.parent_id,
            created_at: Utc::now(),
        }))
    }

    async fn update_comment(&self, id: i64, content: String) -> Result<Option<Comment>> {
        Ok(self.lock().comments.update(id, |row| row.content = content))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        Ok(self.lock().comments.remove(id))
    }

    // Favorite methods
    async fn get_favorite(&self, id: i64) -> Result<Option<Favorite>> {
        Ok(self.lock().favorites.get(id))
    }

    async fn list_favorites_by_user(&self, user_id: i64) -> Result<Vec<Favorite>> {
        Ok(self.lock().favorites.filter(|f| f.user_id == user_id))
    }

    async fn list_favorites_by_document(&self, document_id: i64) -> Result<Vec<Favorite>> {
        Ok(self.lock().favorites.filter(|f| f.document_id == document_id))
    }

    async fn create_favorite(&self, favorite: NewFavorite) -> Result<Favorite> {
        let mut tables = self.lock();
        if tables
            .favorites
            .any(|f| f.user_id == favorite.user_id && f.document_id == favorite.document_id)
        {
            return Err(Error::Duplicate("favorite"));
        }

        Ok(tables.favorites.insert_with(|id| Favorite {
            id,
            document_id: favorite.document_id,
            user_id: favorite.user_id,
            created_at: Utc::now(),
        }))
    }

    async fn delete_favorite(&self, id: i64) -> Result<bool> {
        Ok(self.lock().favorites.remove(id))
    }

    async fn get_favorite_by_user_and_document(
        &self,
        user_id: i64,
        document_id: i64,
    ) -> Result<Option<Favorite>> {
        Ok(self
            .lock()
            .favorites
            .find(|f| f.user_id == user_id && f.document_id == document_id))
    }

    // Announcement methods
    async fn get_announcement(&self, id: i64) -> Result<Option<Announcement>> {
        Ok(self.lock().announcements.get(id))
    }

    async fn list_announcements(&self, active_only: bool) -> Result<Vec<Announcement>> {
        let mut announcements = self
            .lock()
            .announcements
            .filter(|a| !active_only || a.active);
        newest_first(&mut announcements, |a| (a.created_at, a.id));
        Ok(announcements)
    }

    async fn create_announcement(&self, announcement: NewAnnouncement) -> Result<Announcement> {
        Ok(self.lock().announcements.insert_with(|id| Announcement {
            id,
            title: announcement.title,
            content: announcement.content,
            active: announcement.active,
            created_at: Utc::now(),
            created_by: announcement.created_by,
        }))
    }

    async fn update_announcement(
        &self,
        id: i64,
        announcement: UpdateAnnouncement,
    ) -> Result<Option<Announcement>> {
        Ok(self.lock().announcements.update(id, |row| {
            if let Some(title) = announcement.title {
                row.title = title;
            }
            if let Some(content) = announcement.content {
                row.content = content;
            }
            if let Some(active) = announcement.active {
                row.active = active;
            }
        }))
    }

    async fn delete_announcement(&self, id: i64) -> Result<bool> {
        Ok(self.lock().announcements.remove(id))
    }

    // Setting methods
    async fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        Ok(self.lock().settings.find(|s| s.key == key))
    }

    async fn list_settings(&self, keys: &[String]) -> Result<Vec<Setting>> {
        Ok(self
            .lock()
            .settings
            .filter(|s| keys.is_empty() || keys.contains(&s.key)))
    }

    async fn create_setting(&self, setting: NewSetting) -> Result<Setting> {
        let mut tables = self.lock();
        if tables.settings.any(|s| s.key == setting.key) {
            return Err(Error::Duplicate("setting"));
        }

        Ok(tables.settings.insert_with(|id| Setting {
            id,
            key: setting.key,
            value: setting.value,
            updated_at: Utc::now(),
        }))
    }

    async fn update_setting(&self, id: i64, value: String) -> Result<Option<Setting>> {
        Ok(self.lock().settings.update(id, |row| {
            row.value = value;
            row.updated_at = Utc::now();
        }))
    }

    async fn upsert_setting(&self, key: &str, value: String) -> Result<Setting> {
        let mut tables = self.lock();
        if let Some(existing) = tables.settings.find(|s| s.key == key) {
            if let Some(updated) = tables.settings.update(existing.id, |row| {
                row.value = value.clone();
                row.updated_at = Utc::now();
            }) {
                return Ok(updated);
            }
        }

        Ok(tables.settings.insert_with(|id| Setting {
            id,
            key: key.to_string(),
            value,
            updated_at: Utc::now(),
        }))
    }

    async fn delete_setting(&self, id: i64) -> Result<bool> {
        Ok(self.lock().settings.remove(id))
    }
}
