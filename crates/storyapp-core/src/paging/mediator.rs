//! Page loading into the story cache
//!
//! The mediator answers the list's requests for more data:
//!
//! - `Refresh` fetches page 1 and replaces the cache with it
//! - `Append` fetches the page after the last cached one
//! - `Prepend` is never needed: the feed only grows forward
//!
//! A page shorter than the page size ends the feed. Loads are serialized:
//! a second `load` waits until the first one has written its page.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::StoryApi;
use crate::storage::{StorageResult, StoryCache};

/// First page of the feed
pub const STARTING_PAGE_INDEX: u32 = 1;

/// Which end of the list needs data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    Refresh,
    Prepend,
    Append,
}

/// What a load achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediatorResult {
    Success { end_of_pagination_reached: bool },
    /// Nothing was written; calling `load` again may succeed
    RetryableFailure(String),
}

/// Bridges the story service and the local cache
pub struct StoryMediator<A> {
    api: Arc<A>,
    cache: Arc<Mutex<StoryCache>>,
    page_size: u32,
    load_lock: Mutex<()>,
}

impl<A: StoryApi> StoryMediator<A> {
    pub fn new(api: Arc<A>, cache: Arc<Mutex<StoryCache>>, page_size: u32) -> Self {
        Self {
            api,
            cache,
            page_size: page_size.max(1),
            load_lock: Mutex::new(()),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Empty the cache once any in-flight load has finished
    pub async fn clear(&self) -> StorageResult<()> {
        let _in_flight = self.load_lock.lock().await;
        self.cache.lock().await.clear()
    }

    /// Load one page in the given direction
    ///
    /// Network and decoding problems come back as
    /// [`MediatorResult::RetryableFailure`]; a failing cache is returned as
    /// an error since retrying will not fix it.
    pub async fn load(&self, load_type: LoadType) -> StorageResult<MediatorResult> {
        let _in_flight = self.load_lock.lock().await;

        let page = match load_type {
            LoadType::Refresh => STARTING_PAGE_INDEX,
            LoadType::Prepend => {
                return Ok(MediatorResult::Success {
                    end_of_pagination_reached: true,
                })
            }
            LoadType::Append => {
                let tail = self.cache.lock().await.last_bookmark()?;
                match tail.and_then(|bookmark| bookmark.keys.next_key) {
                    Some(next) => next,
                    None => {
                        debug!("Append skipped: feed already complete");
                        return Ok(MediatorResult::Success {
                            end_of_pagination_reached: true,
                        });
                    }
                }
            }
        };

        debug!("Loading page {} ({:?})", page, load_type);

        let response = match self.api.get_stories(page, self.page_size, false).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to load page {}: {}", page, e);
                return Ok(MediatorResult::RetryableFailure(e.to_string()));
            }
        };

        if response.error {
            warn!("Server refused page {}: {}", page, response.message);
            return Ok(MediatorResult::RetryableFailure(response.message));
        }

        let items = response.list_story;
        let end_reached = (items.len() as u32) < self.page_size;

        let mut cache = self.cache.lock().await;
        match load_type {
            LoadType::Refresh => cache.replace_all(&items, page, end_reached)?,
            _ if items.is_empty() => {
                cache.seal_tail(page)?;
            }
            _ => cache.append(&items, page, end_reached)?,
        }

        info!(
            "Loaded page {} with {} stories (end_reached={})",
            page,
            items.len(),
            end_reached
        );

        Ok(MediatorResult::Success {
            end_of_pagination_reached: end_reached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{feed_of, story, FakeStoryApi};
    use std::time::Duration;

    fn setup(feed_len: usize) -> (Arc<FakeStoryApi>, Arc<Mutex<StoryCache>>, StoryMediator<FakeStoryApi>) {
        let api = Arc::new(FakeStoryApi::with_feed(feed_of(feed_len)));
        let cache = Arc::new(Mutex::new(StoryCache::open_in_memory().unwrap()));
        let mediator = StoryMediator::new(Arc::clone(&api), Arc::clone(&cache), 20);
        (api, cache, mediator)
    }

    async fn cached_ids(cache: &Arc<Mutex<StoryCache>>) -> Vec<String> {
        cache
            .lock()
            .await
            .read_all()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect()
    }

    fn success(end: bool) -> MediatorResult {
        MediatorResult::Success {
            end_of_pagination_reached: end,
        }
    }

    #[tokio::test]
    async fn test_refresh_caches_first_page_in_order() {
        let (api, cache, mediator) = setup(45);

        let result = mediator.load(LoadType::Refresh).await.unwrap();

        assert_eq!(result, success(false));
        let expected: Vec<String> = feed_of(20).into_iter().map(|s| s.id).collect();
        assert_eq!(cached_ids(&cache).await, expected);
        assert_eq!(api.page_calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_refresh_discards_previous_pages() {
        let (api, cache, mediator) = setup(45);
        mediator.load(LoadType::Refresh).await.unwrap();
        mediator.load(LoadType::Append).await.unwrap();
        assert_eq!(cache.lock().await.story_count().unwrap(), 40);

        api.set_feed(vec![story("fresh-1"), story("fresh-2")]);
        let result = mediator.load(LoadType::Refresh).await.unwrap();

        assert_eq!(result, success(true));
        assert_eq!(cached_ids(&cache).await, vec!["fresh-1", "fresh-2"]);
    }

    #[tokio::test]
    async fn test_append_walks_pages_until_short_page() {
        let (api, cache, mediator) = setup(45);

        mediator.load(LoadType::Refresh).await.unwrap();
        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(false));
        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(true));

        assert_eq!(api.page_calls(), vec![1, 2, 3]);
        assert_eq!(cache.lock().await.story_count().unwrap(), 45);

        // Short last page: no further request
        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(true));
        assert_eq!(api.page_calls(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_short_first_page_stops_append() {
        let (api, _cache, mediator) = setup(7);

        assert_eq!(mediator.load(LoadType::Refresh).await.unwrap(), success(true));
        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(true));

        assert_eq!(api.page_calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_full_page_then_empty_page_seals_tail() {
        let (api, cache, mediator) = setup(20);

        assert_eq!(mediator.load(LoadType::Refresh).await.unwrap(), success(false));
        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(true));
        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(true));

        assert_eq!(api.page_calls(), vec![1, 2]);
        assert_eq!(cache.lock().await.story_count().unwrap(), 20);
    }

    #[tokio::test]
    async fn test_append_on_empty_cache_is_complete() {
        let (api, _cache, mediator) = setup(45);

        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(true));
        assert!(api.page_calls().is_empty());
    }

    #[tokio::test]
    async fn test_prepend_is_noop() {
        let (api, _cache, mediator) = setup(45);

        assert_eq!(mediator.load(LoadType::Prepend).await.unwrap(), success(true));
        assert!(api.page_calls().is_empty());
    }

    #[tokio::test]
    async fn test_append_never_duplicates_ids() {
        let (api, cache, mediator) = setup(45);
        mediator.load(LoadType::Refresh).await.unwrap();

        // A new story at the head shifts everything by one
        let mut shifted = vec![story("brand-new")];
        shifted.extend(feed_of(45));
        api.set_feed(shifted);
        mediator.load(LoadType::Append).await.unwrap();

        let ids = cached_ids(&cache).await;
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(ids.len(), 39);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cache() {
        let (api, cache, mediator) = setup(45);
        mediator.load(LoadType::Refresh).await.unwrap();
        let before = cached_ids(&cache).await;

        api.fail_pages(true);
        let result = mediator.load(LoadType::Refresh).await.unwrap();

        assert!(matches!(result, MediatorResult::RetryableFailure(ref m) if m.contains("Unable to resolve host")));
        assert_eq!(cached_ids(&cache).await, before);
    }

    #[tokio::test]
    async fn test_failed_append_keeps_cache_and_can_retry() {
        let (api, cache, mediator) = setup(45);
        mediator.load(LoadType::Refresh).await.unwrap();

        api.fail_pages(true);
        let failed = mediator.load(LoadType::Append).await.unwrap();
        assert!(matches!(failed, MediatorResult::RetryableFailure(_)));
        assert_eq!(cache.lock().await.story_count().unwrap(), 20);

        api.fail_pages(false);
        assert_eq!(mediator.load(LoadType::Append).await.unwrap(), success(false));
        assert_eq!(api.page_calls(), vec![1, 2, 2]);
        assert_eq!(cache.lock().await.story_count().unwrap(), 40);
    }

    #[tokio::test]
    async fn test_clear_waits_for_in_flight_append() {
        let (api, cache, mediator) = setup(45);
        mediator.load(LoadType::Refresh).await.unwrap();
        api.delay_pages(Duration::from_millis(30));
        let mediator = Arc::new(mediator);

        let append = tokio::spawn({
            let mediator = Arc::clone(&mediator);
            async move { mediator.load(LoadType::Append).await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        mediator.clear().await.unwrap();
        append.await.unwrap().unwrap();

        assert_eq!(cache.lock().await.story_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loads_are_single_flight() {
        let (api, cache, mediator) = setup(45);
        api.delay_pages(Duration::from_millis(30));
        let mediator = Arc::new(mediator);

        mediator.load(LoadType::Refresh).await.unwrap();
        let first = tokio::spawn({
            let mediator = Arc::clone(&mediator);
            async move { mediator.load(LoadType::Append).await }
        });
        let second = tokio::spawn({
            let mediator = Arc::clone(&mediator);
            async move { mediator.load(LoadType::Append).await }
        });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(api.max_in_flight(), 1);
        // The second append saw the first one's bookmark
        assert_eq!(api.page_calls(), vec![1, 2, 3]);
        assert_eq!(cache.lock().await.story_count().unwrap(), 45);
    }
}
