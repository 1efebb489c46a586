//! Story service API
//!
//! [`StoryApi`] is the typed binding the rest of the crate talks to;
//! [`HttpStoryApi`] implements it over HTTP/JSON. The binding only
//! transports: it reports the service's `error` flag as data and leaves
//! turning failures into user-facing messages to the repository.

use std::future::Future;

use thiserror::Error;

use crate::models::{
    LoginResponse, MessageResponse, StoryDetailResponse, StoryListResponse, UploadRequest,
};

mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpStoryApi;

/// Errors raised while talking to the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// The service answered with a non-2xx status
    #[error("HTTP {status}")]
    Http { status: u16, body: String },

    /// Connection, TLS or protocol failure
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx body that is not the expected JSON
    #[error("Invalid response from server: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request could not be issued at all
    #[error("{0}")]
    Unavailable(String),
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// A 2xx response that may still carry an application-level error
pub trait ServerReply {
    fn is_error(&self) -> bool;
    fn message(&self) -> &str;
}

macro_rules! server_reply {
    ($($ty:ty),*) => {
        $(impl ServerReply for $ty {
            fn is_error(&self) -> bool {
                self.error
            }

            fn message(&self) -> &str {
                &self.message
            }
        })*
    };
}

server_reply!(
    MessageResponse,
    LoginResponse,
    StoryListResponse,
    StoryDetailResponse
);

/// Typed calls offered by the story service
pub trait StoryApi: Send + Sync + 'static {
    /// Create an account
    fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = ApiResult<MessageResponse>> + Send;

    /// Exchange credentials for a bearer token
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = ApiResult<LoginResponse>> + Send;

    /// One page of the feed, newest first (`page` starts at 1)
    fn get_stories(
        &self,
        page: u32,
        size: u32,
        with_location: bool,
    ) -> impl Future<Output = ApiResult<StoryListResponse>> + Send;

    /// Stories that carry coordinates
    fn get_stories_with_location(
        &self,
    ) -> impl Future<Output = ApiResult<StoryListResponse>> + Send;

    /// A single story
    fn get_detail_story(
        &self,
        id: &str,
    ) -> impl Future<Output = ApiResult<StoryDetailResponse>> + Send;

    /// Upload a photo with its description and optional coordinates
    fn upload_story(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = ApiResult<MessageResponse>> + Send;
}
