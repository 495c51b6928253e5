pub mod announcement;
pub mod comment;
pub mod document;
pub mod favorite;
pub mod rating;
pub mod setting;
pub mod subject;
pub mod user;

pub use announcement::{Announcement, NewAnnouncement, UpdateAnnouncement};
pub use comment::{Comment, CommentBody, NewComment};
pub use document::{Document, DocumentFilter, DocumentQuery, NewDocument, UpdateDocument};
pub use favorite::{Favorite, NewFavorite};
pub use rating::{NewRating, Rating, RatingBody};
pub use setting::{NewSetting, Setting};
pub use subject::{NewSubject, Subject, UpdateSubject};
pub use user::{NewUser, Role, UpdateUser, User, UserProfile};
