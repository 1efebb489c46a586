//! The feed screen

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use super::ViewModelScope;
use crate::api::StoryApi;
use crate::models::SessionRecord;
use crate::paging::StoryPager;
use crate::repository::Repository;

/// Session plus the paged story list
pub struct MainViewModel<A> {
    repository: Arc<Repository<A>>,
    pager: Arc<StoryPager<A>>,
    scope: ViewModelScope,
}

impl<A: StoryApi> MainViewModel<A> {
    /// Build the view model, showing whatever the cache already holds
    pub async fn new(repository: Arc<Repository<A>>) -> Self {
        let pager = Arc::new(repository.get_stories_paged().await);
        Self {
            repository,
            pager,
            scope: ViewModelScope::new(),
        }
    }

    pub fn session(&self) -> watch::Receiver<SessionRecord> {
        self.repository.get_session()
    }

    /// The live story list
    pub fn stories(&self) -> Arc<StoryPager<A>> {
        Arc::clone(&self.pager)
    }

    /// Reload the feed from the first page
    pub fn refresh(&self) -> JoinHandle<()> {
        let pager = Arc::clone(&self.pager);
        self.scope.launch(async move {
            pager.refresh().await;
        })
    }

    /// Fetch the next page, if any
    pub fn load_more(&self) -> JoinHandle<()> {
        let pager = Arc::clone(&self.pager);
        self.scope.launch(async move {
            pager.load_more().await;
        })
    }

    /// Forget the session and the cached feed
    pub fn logout(&self) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let pager = Arc::clone(&self.pager);
        self.scope.launch(async move {
            if let Err(e) = repository.logout().await {
                warn!("Logout failed: {}", e);
            }
            pager.reload().await;
        })
    }
}
