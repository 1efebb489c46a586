//! Live paginated view of the story feed
//!
//! A pager publishes a [`PagingSnapshot`] (the cached stories plus the
//! state of each load direction) through a watch channel. Screens subscribe
//! and ask for more with [`StoryPager::refresh`] and
//! [`StoryPager::load_more`]. Failures never escape: they show up as
//! [`LoadStatus::Error`], which the list renders as a retry affordance.

use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use super::mediator::{LoadType, MediatorResult, StoryMediator};
use crate::api::StoryApi;
use crate::models::StoryItem;
use crate::storage::{StorageResult, StoryCache};

/// State of one load direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    NotLoading { end_of_pagination_reached: bool },
    Loading,
    Error(String),
}

impl LoadStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, LoadStatus::Error(_))
    }

    pub fn end_reached(&self) -> bool {
        matches!(
            self,
            LoadStatus::NotLoading {
                end_of_pagination_reached: true
            }
        )
    }
}

impl Default for LoadStatus {
    fn default() -> Self {
        LoadStatus::NotLoading {
            end_of_pagination_reached: false,
        }
    }
}

/// Load state per direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStates {
    pub refresh: LoadStatus,
    pub prepend: LoadStatus,
    pub append: LoadStatus,
}

impl Default for LoadStates {
    fn default() -> Self {
        Self {
            refresh: LoadStatus::default(),
            // Forward-only feed
            prepend: LoadStatus::NotLoading {
                end_of_pagination_reached: true,
            },
            append: LoadStatus::default(),
        }
    }
}

/// What the list shows right now
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagingSnapshot {
    pub items: Vec<StoryItem>,
    pub load_states: LoadStates,
}

/// Rows read back from the cache after a load
#[derive(Debug, PartialEq)]
enum CacheRead {
    /// The whole list, replacing what was shown
    Full(Vec<StoryItem>),
    /// Rows added after the last one shown
    Tail(Vec<StoryItem>),
}

impl CacheRead {
    fn apply(self, items: &mut Vec<StoryItem>) {
        match self {
            CacheRead::Full(all) => *items = all,
            CacheRead::Tail(tail) => items.extend(tail),
        }
    }
}

/// Paginated story list backed by the local cache
pub struct StoryPager<A> {
    mediator: Arc<StoryMediator<A>>,
    cache: Arc<Mutex<StoryCache>>,
    state: watch::Sender<PagingSnapshot>,
    /// `seq` of the last published row; held while publishing items
    cursor: Mutex<Option<i64>>,
}

impl<A: StoryApi> StoryPager<A> {
    pub fn new(mediator: Arc<StoryMediator<A>>, cache: Arc<Mutex<StoryCache>>) -> Self {
        let (state, _) = watch::channel(PagingSnapshot::default());
        Self {
            mediator,
            cache,
            state,
            cursor: Mutex::new(None),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PagingSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<PagingSnapshot> {
        self.state.subscribe()
    }

    /// Every snapshot published from now on, as a stream
    pub fn updates(&self) -> impl Stream<Item = PagingSnapshot> + Send + 'static {
        futures_util::stream::unfold(self.state.subscribe(), |mut rx| async move {
            rx.changed().await.ok()?;
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, rx))
        })
    }

    /// Reload from page 1, replacing the cached list
    pub async fn refresh(&self) -> LoadStatus {
        self.run(LoadType::Refresh).await
    }

    /// Load the page after the last cached story
    pub async fn load_more(&self) -> LoadStatus {
        self.run(LoadType::Append).await
    }

    /// Repeat whichever load last failed
    pub async fn retry(&self) -> Option<LoadStatus> {
        let states = self.snapshot().load_states;
        if states.refresh.is_error() {
            Some(self.refresh().await)
        } else if states.append.is_error() {
            Some(self.load_more().await)
        } else {
            None
        }
    }

    /// Number of feed pages held in the cache
    ///
    /// Counted from the bookmark of the most recently fetched page, so an
    /// unreadable cache counts as empty.
    pub async fn loaded_pages(&self) -> u32 {
        match self.cache.lock().await.last_bookmark() {
            Ok(Some(bookmark)) => bookmark.keys.prev_key.map_or(1, |prev| prev + 1),
            Ok(None) => 0,
            Err(e) => {
                warn!("Story cache unreadable, counting no pages: {}", e);
                0
            }
        }
    }

    /// Re-read the cache without touching the network
    pub async fn reload(&self) {
        self.publish_items(false).await;
    }

    async fn run(&self, load_type: LoadType) -> LoadStatus {
        self.set_status(load_type, LoadStatus::Loading);

        let status = match self.mediator.load(load_type).await {
            Ok(MediatorResult::Success {
                end_of_pagination_reached,
            }) => LoadStatus::NotLoading {
                end_of_pagination_reached,
            },
            Ok(MediatorResult::RetryableFailure(message)) => LoadStatus::Error(message),
            Err(e) => {
                warn!("Story paging pipeline failed: {}", e);
                LoadStatus::Error(e.to_string())
            }
        };

        let mut cursor = self.cursor.lock().await;
        let shown = self.state.borrow().items.len();
        let read = self
            .read_cache(&mut cursor, shown, load_type == LoadType::Append)
            .await;
        self.state.send_modify(|snapshot| {
            read.apply(&mut snapshot.items);
            match load_type {
                LoadType::Refresh => {
                    snapshot.load_states.refresh = status.clone();
                    // A successful refresh restarts the tail
                    if matches!(status, LoadStatus::NotLoading { .. }) {
                        snapshot.load_states.append = status.clone();
                    }
                }
                LoadType::Append => snapshot.load_states.append = status.clone(),
                LoadType::Prepend => snapshot.load_states.prepend = status.clone(),
            }
        });

        status
    }

    fn set_status(&self, load_type: LoadType, status: LoadStatus) {
        self.state.send_modify(|snapshot| match load_type {
            LoadType::Refresh => snapshot.load_states.refresh = status,
            LoadType::Append => snapshot.load_states.append = status,
            LoadType::Prepend => snapshot.load_states.prepend = status,
        });
    }

    async fn publish_items(&self, tail_only: bool) {
        let mut cursor = self.cursor.lock().await;
        let shown = self.state.borrow().items.len();
        let read = self.read_cache(&mut cursor, shown, tail_only).await;
        self.state.send_modify(|snapshot| read.apply(&mut snapshot.items));
    }

    /// Read back what the list should show, or nothing if the cache cannot
    /// be read
    async fn read_cache(
        &self,
        cursor: &mut Option<i64>,
        shown: usize,
        tail_only: bool,
    ) -> CacheRead {
        let cache = self.cache.lock().await;
        let chunk = self.mediator.page_size() as usize;
        match read_view(&cache, *cursor, shown, tail_only, chunk) {
            Ok((read, last)) => {
                *cursor = last;
                read
            }
            Err(e) => {
                warn!("Story cache unreadable, showing an empty list: {}", e);
                *cursor = None;
                CacheRead::Full(Vec::new())
            }
        }
    }
}

/// Decide between a tail read and a full read
///
/// A tail read only covers rows inserted after `cursor`. If the cache no
/// longer holds exactly the `shown` rows plus that tail (it was refreshed or
/// cleared elsewhere), the whole list is read instead.
fn read_view(
    cache: &StoryCache,
    cursor: Option<i64>,
    shown: usize,
    tail_only: bool,
    chunk: usize,
) -> StorageResult<(CacheRead, Option<i64>)> {
    if tail_only {
        let (tail, last) = read_rows(cache, cursor, chunk)?;
        if cache.story_count()? == (shown + tail.len()) as i64 {
            return Ok((CacheRead::Tail(tail), last));
        }
        debug!("Cached feed changed underneath the pager, reading it again");
    }

    let (items, last) = read_rows(cache, None, chunk)?;
    Ok((CacheRead::Full(items), last))
}

/// Stories after `after`, with the `seq` of the last one read
fn read_rows(
    cache: &StoryCache,
    after: Option<i64>,
    chunk: usize,
) -> StorageResult<(Vec<StoryItem>, Option<i64>)> {
    let mut items = Vec::new();
    let mut last = after;
    for rows in cache.chunks_after(after, chunk) {
        for row in rows? {
            last = Some(row.seq);
            items.push(row.story);
        }
    }
    Ok((items, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{feed_of, FakeStoryApi};
    use futures_util::StreamExt;

    fn pager_over(feed_len: usize) -> (Arc<FakeStoryApi>, StoryPager<FakeStoryApi>) {
        let api = Arc::new(FakeStoryApi::with_feed(feed_of(feed_len)));
        let cache = Arc::new(Mutex::new(StoryCache::open_in_memory().unwrap()));
        let mediator = Arc::new(StoryMediator::new(Arc::clone(&api), Arc::clone(&cache), 20));
        (api, StoryPager::new(mediator, cache))
    }

    #[tokio::test]
    async fn test_refresh_publishes_first_page() {
        let (_api, pager) = pager_over(20);

        let status = pager.refresh().await;

        assert_eq!(
            status,
            LoadStatus::NotLoading {
                end_of_pagination_reached: false
            }
        );
        let snapshot = pager.snapshot();
        assert_eq!(snapshot.items.len(), 20);
        assert_eq!(snapshot.items[0].id, "story-000");
    }

    #[tokio::test]
    async fn test_scrolling_to_the_end() {
        let (api, pager) = pager_over(30);

        pager.refresh().await;
        assert!(pager.load_more().await.end_reached());
        assert!(pager.load_more().await.end_reached());

        assert_eq!(pager.snapshot().items.len(), 30);
        assert_eq!(api.page_calls(), vec![1, 2]);
        assert!(pager.snapshot().load_states.append.end_reached());
    }

    #[tokio::test]
    async fn test_failure_becomes_retry_state() {
        let (api, pager) = pager_over(45);
        pager.refresh().await;

        api.fail_pages(true);
        let status = pager.load_more().await;
        assert!(status.is_error());
        assert_eq!(pager.snapshot().items.len(), 20);

        api.fail_pages(false);
        let retried = pager.retry().await.unwrap();
        assert!(!retried.is_error());
        assert_eq!(pager.snapshot().items.len(), 40);
        assert!(pager.retry().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cached_items() {
        let (api, pager) = pager_over(45);
        pager.refresh().await;

        api.fail_pages(true);
        pager.refresh().await;

        let snapshot = pager.snapshot();
        assert!(snapshot.load_states.refresh.is_error());
        assert_eq!(snapshot.items.len(), 20);
    }

    #[tokio::test]
    async fn test_reload_reads_cache_only() {
        let (api, pager) = pager_over(45);
        pager.refresh().await;

        let second = StoryPager::new(Arc::clone(&pager.mediator), Arc::clone(&pager.cache));
        second.reload().await;

        assert_eq!(second.snapshot().items.len(), 20);
        assert_eq!(api.page_calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_loaded_pages_follows_the_tail() {
        let (_api, pager) = pager_over(45);
        assert_eq!(pager.loaded_pages().await, 0);

        pager.refresh().await;
        assert_eq!(pager.loaded_pages().await, 1);

        pager.load_more().await;
        pager.load_more().await;
        assert_eq!(pager.loaded_pages().await, 3);

        pager.refresh().await;
        assert_eq!(pager.loaded_pages().await, 1);
    }

    #[test]
    fn test_append_reads_only_the_new_tail() {
        let mut cache = StoryCache::open_in_memory().unwrap();
        cache.replace_all(&feed_of(20), 1, false).unwrap();
        let (first, cursor) = read_rows(&cache, None, 7).unwrap();
        assert_eq!(first.len(), 20);

        cache.append(&feed_of(25)[20..], 2, true).unwrap();
        let (read, last) = read_view(&cache, cursor, first.len(), true, 7).unwrap();

        match read {
            CacheRead::Tail(tail) => {
                assert_eq!(tail.len(), 5);
                assert_eq!(tail[0].id, "story-020");
            }
            other => panic!("expected a tail read, got {:?}", other),
        }
        assert!(last > cursor);
    }

    #[test]
    fn test_tail_read_falls_back_when_cache_was_replaced() {
        let mut cache = StoryCache::open_in_memory().unwrap();
        cache.replace_all(&feed_of(20), 1, false).unwrap();
        let (first, cursor) = read_rows(&cache, None, 20).unwrap();

        cache.replace_all(&feed_of(3), 1, true).unwrap();
        let (read, _) = read_view(&cache, cursor, first.len(), true, 20).unwrap();

        assert_eq!(read, CacheRead::Full(feed_of(3)));
    }

    #[tokio::test]
    async fn test_load_more_after_clear_drops_stale_rows() {
        let (_api, pager) = pager_over(45);
        pager.refresh().await;
        pager.load_more().await;
        assert_eq!(pager.snapshot().items.len(), 40);

        pager.mediator.clear().await.unwrap();
        pager.load_more().await;

        assert!(pager.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn test_updates_stream() {
        let (_api, pager) = pager_over(5);
        let mut updates = Box::pin(pager.updates());

        pager.refresh().await;

        let latest = updates.next().await.unwrap();
        assert_eq!(latest.items.len(), 5);
        assert!(latest.load_states.refresh.end_reached());
    }
}
