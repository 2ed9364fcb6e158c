use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::app::posts::PostService;
use crate::domain::post::{Page, PageWindow, Post};
use crate::infra::{cache::RedisCache, db::Db};

const FEED_VERSION_KEY: &str = "feed:version";

#[derive(Clone)]
pub struct FeedService {
    posts: PostService,
    cache: RedisCache,
    page_size: i64,
    cache_ttl_seconds: u64,
}

impl FeedService {
    pub fn new(db: Db, cache: RedisCache, page_size: i64, cache_ttl_seconds: u64) -> Self {
        Self {
            posts: PostService::new(db),
            cache,
            page_size,
            cache_ttl_seconds,
        }
    }

    /// Every post, most recently updated first, one page at a time.
    ///
    /// Pages are cached briefly under a version counter that is bumped on
    /// every post write, so a cached page never outlives the data it shows.
    pub async fn list_feed(&self, requested_page: Option<&str>) -> Result<Page<Post>> {
        let version = self.cache.get_counter(FEED_VERSION_KEY).await;
        let cache_key = version.map(|version| {
            format!(
                "feed:v{}:size:{}:page:{}",
                version,
                self.page_size,
                page_cache_token(requested_page)
            )
        });

        if let Some(key) = &cache_key {
            if let Some(payload) = self.cache.get_string(key).await {
                match serde_json::from_str::<CachedPage>(&payload) {
                    Ok(cached) => return Ok(cached.into()),
                    Err(err) => warn!(error = ?err, "discarding unreadable feed cache entry"),
                }
            }
        }

        let total = self.posts.count_posts().await?;
        let window = PageWindow::resolve(requested_page, total, self.page_size);
        let items = self.posts.list_recent(window.offset, window.limit).await?;
        let page = window.into_page(items, total);

        if let Some(key) = &cache_key {
            match serde_json::to_string(&CachedPage::from(&page)) {
                Ok(payload) => {
                    self.cache
                        .set_string_ex(key, payload, self.cache_ttl_seconds)
                        .await
                }
                Err(err) => warn!(error = ?err, "failed to encode feed page"),
            }
        }

        Ok(page)
    }

    pub async fn invalidate(&self) {
        self.cache.incr_counter(FEED_VERSION_KEY).await;
    }
}

/// Requests that resolve the same way share one cache entry.
fn page_cache_token(requested_page: Option<&str>) -> String {
    match requested_page.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) => n.to_string(),
        _ => "first".to_string(),
    }
}

/// Cache record for a feed page. `Post` hides its internal ids from clients,
/// so the cache keeps its own copy of every field.
#[derive(Serialize, Deserialize)]
struct CachedPage {
    items: Vec<CachedPost>,
    page: i64,
    num_pages: i64,
    total: i64,
    has_next: bool,
    has_previous: bool,
}

#[derive(Serialize, Deserialize)]
struct CachedPost {
    id: i64,
    uuid: Uuid,
    title: String,
    content: String,
    image: String,
    author_id: i64,
    author_uuid: Uuid,
    author: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl From<&Page<Post>> for CachedPage {
    fn from(page: &Page<Post>) -> Self {
        Self {
            items: page
                .items
                .iter()
                .map(|post| CachedPost {
                    id: post.id,
                    uuid: post.uuid,
                    title: post.title.clone(),
                    content: post.content.clone(),
                    image: post.image.clone(),
                    author_id: post.author_id,
                    author_uuid: post.author_uuid,
                    author: post.author.clone(),
                    created_at: post.created_at,
                    updated_at: post.updated_at,
                })
                .collect(),
            page: page.page,
            num_pages: page.num_pages,
            total: page.total,
            has_next: page.has_next,
            has_previous: page.has_previous,
        }
    }
}

impl From<CachedPage> for Page<Post> {
    fn from(cached: CachedPage) -> Self {
        Self {
            items: cached
                .items
                .into_iter()
                .map(|post| Post {
                    id: post.id,
                    uuid: post.uuid,
                    title: post.title,
                    content: post.content,
                    image: post.image,
                    image_url: None,
                    author_id: post.author_id,
                    author_uuid: post.author_uuid,
                    author: post.author,
                    created_at: post.created_at,
                    updated_at: post.updated_at,
                })
                .collect(),
            page: cached.page,
            num_pages: cached.num_pages,
            total: cached.total,
            has_next: cached.has_next,
            has_previous: cached.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_requests_share_a_cache_token() {
        assert_eq!(page_cache_token(None), "first");
        assert_eq!(page_cache_token(Some("abc")), "first");
        assert_eq!(page_cache_token(Some(" 2 ")), "2");
    }

    #[test]
    fn cached_page_keeps_internal_ids() {
        let post = Post {
            id: 41,
            uuid: Uuid::new_v4(),
            title: "title".into(),
            content: "content".into(),
            image: "posts/images/a.png".into(),
            image_url: Some("/media/posts/images/a.png".into()),
            author_id: 9,
            author_uuid: Uuid::new_v4(),
            author: "ana".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let page = PageWindow::resolve(None, 1, 3).into_page(vec![post], 1);

        let payload = serde_json::to_string(&CachedPage::from(&page)).unwrap();
        let restored: Page<Post> = serde_json::from_str::<CachedPage>(&payload).unwrap().into();

        assert_eq!(restored.items[0].id, 41);
        assert_eq!(restored.items[0].author_id, 9);
        assert_eq!(restored.items[0].image, "posts/images/a.png");
        assert!(restored.items[0].image_url.is_none());
        assert_eq!(restored.page, 1);
    }
}
