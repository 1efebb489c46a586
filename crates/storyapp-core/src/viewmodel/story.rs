//! Story detail, upload and map screens
//!
//! Each publishes `None` until its first request, then `Loading` followed
//! by the repository's outcome.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ViewModelScope;
use crate::api::StoryApi;
use crate::models::{StoryItem, StoryListResponse, UploadRequest};
use crate::outcome::Outcome;
use crate::repository::Repository;

/// One story, looked up by id
pub struct DetailStoryViewModel<A> {
    repository: Arc<Repository<A>>,
    story: Arc<watch::Sender<Option<Outcome<StoryItem>>>>,
    scope: ViewModelScope,
}

impl<A: StoryApi> DetailStoryViewModel<A> {
    pub fn new(repository: Arc<Repository<A>>) -> Self {
        Self {
            repository,
            story: Arc::new(watch::Sender::new(None)),
            scope: ViewModelScope::new(),
        }
    }

    pub fn story(&self) -> watch::Receiver<Option<Outcome<StoryItem>>> {
        self.story.subscribe()
    }

    pub fn load(&self, id: &str) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let story = Arc::clone(&self.story);
        let id = id.to_string();

        self.scope.launch(async move {
            story.send_replace(Some(Outcome::Loading));
            let outcome = repository.get_detail_story(&id).await;
            story.send_replace(Some(outcome));
        })
    }
}

/// The new-story form
pub struct AddStoryViewModel<A> {
    repository: Arc<Repository<A>>,
    upload_result: Arc<watch::Sender<Option<Outcome<String>>>>,
    scope: ViewModelScope,
}

impl<A: StoryApi> AddStoryViewModel<A> {
    pub fn new(repository: Arc<Repository<A>>) -> Self {
        Self {
            repository,
            upload_result: Arc::new(watch::Sender::new(None)),
            scope: ViewModelScope::new(),
        }
    }

    pub fn upload_result(&self) -> watch::Receiver<Option<Outcome<String>>> {
        self.upload_result.subscribe()
    }

    pub fn upload(&self, request: UploadRequest) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let upload_result = Arc::clone(&self.upload_result);

        self.scope.launch(async move {
            upload_result.send_replace(Some(Outcome::Loading));
            let outcome = repository.upload_story(request).await;
            upload_result.send_replace(Some(outcome));
        })
    }
}

/// Stories that can be placed on a map
pub struct MapsViewModel<A> {
    repository: Arc<Repository<A>>,
    stories: Arc<watch::Sender<Option<Outcome<StoryListResponse>>>>,
    scope: ViewModelScope,
}

impl<A: StoryApi> MapsViewModel<A> {
    pub fn new(repository: Arc<Repository<A>>) -> Self {
        Self {
            repository,
            stories: Arc::new(watch::Sender::new(None)),
            scope: ViewModelScope::new(),
        }
    }

    pub fn stories(&self) -> watch::Receiver<Option<Outcome<StoryListResponse>>> {
        self.stories.subscribe()
    }

    pub fn load(&self) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let stories = Arc::clone(&self.stories);

        self.scope.launch(async move {
            stories.send_replace(Some(Outcome::Loading));
            let outcome = repository.get_stories_with_location().await;
            stories.send_replace(Some(outcome));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{story, unreachable_host, FakeStoryApi};
    use crate::api::ApiError;
    use crate::viewmodel::{test_repository, test_repository_with};

    #[tokio::test]
    async fn test_detail_publishes_loading_then_story() {
        let vm = DetailStoryViewModel::new(test_repository(FakeStoryApi::with_feed(vec![
            story("story-1"),
        ])));
        let mut rx = vm.story();
        assert_eq!(*rx.borrow_and_update(), None);

        let handle = vm.load("story-1");
        let first = rx.wait_for(|s| s.is_some()).await.unwrap().clone();
        assert!(matches!(
            first,
            Some(Outcome::Loading) | Some(Outcome::Success(_))
        ));
        handle.await.unwrap();

        assert_eq!(*vm.story().borrow(), Some(Outcome::Success(story("story-1"))));
    }

    #[tokio::test]
    async fn test_detail_missing_story() {
        let vm = DetailStoryViewModel::new(test_repository(FakeStoryApi::default()));

        vm.load("nope").await.unwrap();

        assert_eq!(
            *vm.story().borrow(),
            Some(Outcome::Error("Story not found".to_string()))
        );
    }

    #[tokio::test]
    async fn test_upload_success() {
        let api = Arc::new(FakeStoryApi::default());
        let repository = test_repository_with(Arc::clone(&api));
        let vm = AddStoryViewModel::new(repository);

        let request = UploadRequest::new(vec![0xFF, 0xD8], "photo.jpg", "Sunset")
            .with_location(-6.2, 106.8);
        vm.upload(request).await.unwrap();

        assert_eq!(
            *vm.upload_result().borrow(),
            Some(Outcome::Success("Story created successfully".to_string()))
        );
        assert_eq!(api.uploads(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejected_by_service() {
        let api = FakeStoryApi::default();
        api.reply_upload(Err(ApiError::Http {
            status: 413,
            body: r#"{"error":true,"message":"Payload content length greater than maximum allowed: 1000000"}"#
                .to_string(),
        }));
        let vm = AddStoryViewModel::new(test_repository(api));

        vm.upload(UploadRequest::new(vec![0; 16], "photo.jpg", "Big"))
            .await
            .unwrap();

        let result = vm.upload_result().borrow().clone().unwrap();
        assert!(result.error().unwrap().starts_with("Payload content length"));
    }

    #[tokio::test]
    async fn test_maps_only_located_stories() {
        let mut located = story("geo");
        located.lat = Some(-7.25);
        located.lon = Some(112.75);
        let vm = MapsViewModel::new(test_repository(FakeStoryApi::with_feed(vec![
            story("plain"),
            located.clone(),
        ])));

        vm.load().await.unwrap();

        let outcome = vm.stories().borrow().clone().unwrap();
        assert_eq!(outcome.success().unwrap().list_story, vec![located]);
    }

    #[tokio::test]
    async fn test_maps_offline() {
        let api = FakeStoryApi::default();
        api.reply_located(Err(unreachable_host()));
        let vm = MapsViewModel::new(test_repository(api));

        vm.load().await.unwrap();

        let outcome = vm.stories().borrow().clone().unwrap();
        assert!(outcome.error().unwrap().contains("Unable to resolve host"));
    }
}
