pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{cache::RedisCache, db::Db, storage::ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub storage: ObjectStorage,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub feed_page_size: i64,
    pub feed_cache_ttl_seconds: u64,
}
