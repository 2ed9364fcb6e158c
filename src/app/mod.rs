pub mod auth;
pub mod chat;
pub mod comments;
pub mod feed;
pub mod images;
pub mod interactions;
pub mod posts;
pub mod users;
