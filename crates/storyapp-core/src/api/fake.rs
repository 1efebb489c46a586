//! Scriptable in-memory story service for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ApiError, ApiResult, StoryApi};
use crate::models::{
    LoginResponse, LoginResult, MessageResponse, StoryDetailResponse, StoryItem,
    StoryListResponse, UploadRequest,
};

/// Fake service serving a fixed feed, with one-shot scripted replies
#[derive(Default)]
pub(crate) struct FakeStoryApi {
    feed: Mutex<Vec<StoryItem>>,
    page_calls: Mutex<Vec<u32>>,
    fail_pages: Mutex<bool>,
    page_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    register_reply: Mutex<Option<ApiResult<MessageResponse>>>,
    login_reply: Mutex<Option<ApiResult<LoginResponse>>>,
    detail_reply: Mutex<Option<ApiResult<StoryDetailResponse>>>,
    upload_reply: Mutex<Option<ApiResult<MessageResponse>>>,
    located_reply: Mutex<Option<ApiResult<StoryListResponse>>>,
    uploads: Mutex<Vec<UploadRequest>>,
}

pub(crate) fn story(id: &str) -> StoryItem {
    StoryItem {
        id: id.to_string(),
        name: "Dimas".to_string(),
        description: format!("Story {}", id),
        photo_url: format!("https://story-api.dicoding.dev/images/{}.jpg", id),
        created_at: "2024-01-08T06:34:18.598Z".to_string(),
        lat: None,
        lon: None,
    }
}

pub(crate) fn feed_of(n: usize) -> Vec<StoryItem> {
    (0..n).map(|i| story(&format!("story-{:03}", i))).collect()
}

pub(crate) fn unreachable_host() -> ApiError {
    ApiError::Unavailable("Unable to resolve host \"story-api.dicoding.dev\"".to_string())
}

impl FakeStoryApi {
    pub(crate) fn with_feed(feed: Vec<StoryItem>) -> Self {
        let api = Self::default();
        *api.feed.lock().unwrap() = feed;
        api
    }

    pub(crate) fn set_feed(&self, feed: Vec<StoryItem>) {
        *self.feed.lock().unwrap() = feed;
    }

    pub(crate) fn fail_pages(&self, fail: bool) {
        *self.fail_pages.lock().unwrap() = fail;
    }

    pub(crate) fn delay_pages(&self, delay: Duration) {
        *self.page_delay.lock().unwrap() = Some(delay);
    }

    /// Pages requested so far, in order
    pub(crate) fn page_calls(&self) -> Vec<u32> {
        self.page_calls.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn uploads(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub(crate) fn reply_register(&self, reply: ApiResult<MessageResponse>) {
        *self.register_reply.lock().unwrap() = Some(reply);
    }

    pub(crate) fn reply_login(&self, reply: ApiResult<LoginResponse>) {
        *self.login_reply.lock().unwrap() = Some(reply);
    }

    pub(crate) fn reply_detail(&self, reply: ApiResult<StoryDetailResponse>) {
        *self.detail_reply.lock().unwrap() = Some(reply);
    }

    pub(crate) fn reply_upload(&self, reply: ApiResult<MessageResponse>) {
        *self.upload_reply.lock().unwrap() = Some(reply);
    }

    pub(crate) fn reply_located(&self, reply: ApiResult<StoryListResponse>) {
        *self.located_reply.lock().unwrap() = Some(reply);
    }

    fn page(&self, page: u32, size: u32) -> Vec<StoryItem> {
        let feed = self.feed.lock().unwrap();
        let start = (page.saturating_sub(1) * size) as usize;
        feed.iter().skip(start).take(size as usize).cloned().collect()
    }
}

fn ok_message(message: &str) -> MessageResponse {
    MessageResponse {
        error: false,
        message: message.to_string(),
    }
}

impl StoryApi for FakeStoryApi {
    async fn register(&self, _name: &str, _email: &str, _password: &str) -> ApiResult<MessageResponse> {
        let scripted = self.register_reply.lock().unwrap().take();
        scripted.unwrap_or_else(|| Ok(ok_message("User created")))
    }

    async fn login(&self, email: &str, _password: &str) -> ApiResult<LoginResponse> {
        let scripted = self.login_reply.lock().unwrap().take();
        scripted.unwrap_or_else(|| {
            Ok(LoginResponse {
                error: false,
                message: "success".to_string(),
                login_result: Some(LoginResult {
                    user_id: "user-1".to_string(),
                    name: email.to_string(),
                    token: format!("token-for-{}", email),
                }),
            })
        })
    }

    async fn get_stories(
        &self,
        page: u32,
        size: u32,
        _with_location: bool,
    ) -> ApiResult<StoryListResponse> {
        self.page_calls.lock().unwrap().push(page);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.page_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if *self.fail_pages.lock().unwrap() {
            return Err(unreachable_host());
        }

        Ok(StoryListResponse {
            error: false,
            message: "Stories fetched successfully".to_string(),
            list_story: self.page(page, size),
        })
    }

    async fn get_stories_with_location(&self) -> ApiResult<StoryListResponse> {
        let scripted = self.located_reply.lock().unwrap().take();
        scripted.unwrap_or_else(|| {
            let located = self
                .feed
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.has_location())
                .cloned()
                .collect();
            Ok(StoryListResponse {
                error: false,
                message: "Stories fetched successfully".to_string(),
                list_story: located,
            })
        })
    }

    async fn get_detail_story(&self, id: &str) -> ApiResult<StoryDetailResponse> {
        let scripted = self.detail_reply.lock().unwrap().take();
        scripted.unwrap_or_else(|| {
            let found = self.feed.lock().unwrap().iter().find(|s| s.id == id).cloned();
            Ok(StoryDetailResponse {
                error: found.is_none(),
                message: if found.is_some() {
                    "Story fetched successfully".to_string()
                } else {
                    "Story not found".to_string()
                },
                story: found,
            })
        })
    }

    async fn upload_story(&self, request: UploadRequest) -> ApiResult<MessageResponse> {
        self.uploads.lock().unwrap().push(request);
        let scripted = self.upload_reply.lock().unwrap().take();
        scripted.unwrap_or_else(|| Ok(ok_message("Story created successfully")))
    }
}
