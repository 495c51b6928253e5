pub mod admin_handlers;
pub mod announcement_handlers;
pub mod app;
pub mod auth;
pub mod comment_handlers;
pub mod config;
pub mod db;
pub mod document_handlers;
pub mod favorite_handlers;
pub mod handlers;
pub mod models;
pub mod rating_handlers;
pub mod response;
pub mod setting_handlers;
pub mod subject_handlers;
pub mod validation;
