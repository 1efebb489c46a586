//! Repository
//!
//! The single entry point screens use. It owns the session store, the
//! story service binding and the story cache, and turns every call into an
//! [`Outcome`] so no transport error ever reaches a screen.
//!
//! ## Error messages
//!
//! Every network call is translated the same way:
//!
//! 1. The service answered with `error: true`: its `message`
//! 2. The service answered with a non-2xx status: the `message` field of
//!    the body, or [`UNKNOWN_ERROR`] if the body has none
//! 3. Anything else: the error's own text, or [`UNKNOWN_ERROR`]
//!
//! ## Usage
//!
//! ```ignore
//! let repository = Repository::open(&Config::load()?)?;
//! match repository.login("ana@example.com", "secret").await {
//!     Outcome::Success(response) => { /* save the session */ }
//!     Outcome::Error(message) => eprintln!("{}", message),
//!     Outcome::Loading => {}
//! }
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiResult, HttpStoryApi, ServerReply, StoryApi};
use crate::config::Config;
use crate::models::{
    ErrorResponse, LoginResponse, SessionRecord, StoryItem, StoryListResponse, UploadRequest,
};
use crate::outcome::Outcome;
use crate::paging::{StoryMediator, StoryPager};
use crate::storage::{SessionStore, StorageResult, StoryCache};

/// Message shown when nothing better is available
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Façade over session, remote API and paged cache
pub struct Repository<A> {
    session: Arc<SessionStore>,
    api: Arc<A>,
    cache: Arc<Mutex<StoryCache>>,
    mediator: Arc<StoryMediator<A>>,
}

impl Repository<HttpStoryApi> {
    /// Open the on-disk session and cache and connect to the configured service
    pub fn open(config: &Config) -> Result<Self> {
        let session =
            Arc::new(SessionStore::open(config).context("Failed to open session store")?);
        let api = HttpStoryApi::new(config, Arc::clone(&session))
            .context("Failed to create HTTP client")?;
        let cache = StoryCache::open(config).context("Failed to open story cache")?;

        Ok(Self::new(session, Arc::new(api), cache, config.page_size))
    }
}

impl<A: StoryApi> Repository<A> {
    pub fn new(session: Arc<SessionStore>, api: Arc<A>, cache: StoryCache, page_size: u32) -> Self {
        let cache = Arc::new(Mutex::new(cache));
        let mediator = Arc::new(StoryMediator::new(
            Arc::clone(&api),
            Arc::clone(&cache),
            page_size,
        ));

        Self {
            session,
            api,
            cache,
            mediator,
        }
    }

    // ==================== Session ====================

    /// Overwrite the stored session
    pub fn save_session(&self, session: SessionRecord) -> StorageResult<()> {
        self.session.save(session)
    }

    /// Watch the stored session
    pub fn get_session(&self) -> watch::Receiver<SessionRecord> {
        self.session.subscribe()
    }

    /// Snapshot of the stored session
    pub fn current_session(&self) -> SessionRecord {
        self.session.get()
    }

    /// Forget the user and everything cached for them
    pub async fn logout(&self) -> StorageResult<()> {
        self.session.logout()?;
        self.mediator.clear().await?;
        info!("Logged out; session and story cache cleared");
        Ok(())
    }

    // ==================== Remote calls ====================

    /// Create an account; success carries the service's message
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Outcome<String> {
        debug!("Registering {}", email);
        settle(self.api.register(name, email, password).await, |reply| {
            Outcome::Success(reply.message)
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Outcome<LoginResponse> {
        debug!("Logging in {}", email);
        settle(self.api.login(email, password).await, Outcome::Success)
    }

    pub async fn get_detail_story(&self, id: &str) -> Outcome<StoryItem> {
        settle(self.api.get_detail_story(id).await, |reply| match reply.story {
            Some(story) => Outcome::Success(story),
            None => Outcome::Error(UNKNOWN_ERROR.to_string()),
        })
    }

    /// Upload a story; success carries the service's message
    pub async fn upload_story(&self, request: UploadRequest) -> Outcome<String> {
        debug!("Uploading story ({} bytes)", request.image.len());
        settle(self.api.upload_story(request).await, |reply| {
            Outcome::Success(reply.message)
        })
    }

    /// Stories that carry coordinates, for the map
    pub async fn get_stories_with_location(&self) -> Outcome<StoryListResponse> {
        settle(self.api.get_stories_with_location().await, Outcome::Success)
    }

    // ==================== Feed ====================

    /// A paginated view of the feed, primed with whatever is cached
    ///
    /// Every pager shares the same mediator, so loads from different
    /// pagers never interleave.
    pub async fn get_stories_paged(&self) -> StoryPager<A> {
        let pager = StoryPager::new(Arc::clone(&self.mediator), Arc::clone(&self.cache));
        pager.reload().await;
        pager
    }
}

/// Apply the shared error translation to a service reply
fn settle<R, T>(result: ApiResult<R>, on_success: impl FnOnce(R) -> Outcome<T>) -> Outcome<T>
where
    R: ServerReply,
{
    match result {
        Ok(reply) if reply.is_error() => Outcome::Error(reply.message().to_string()),
        Ok(reply) => on_success(reply),
        Err(e) => {
            warn!("Story service call failed: {}", e);
            Outcome::Error(error_message(&e))
        }
    }
}

/// User-facing text for an API failure
pub fn error_message(error: &ApiError) -> String {
    match error {
        ApiError::Http { body, .. } => message_from_body(body),
        other => {
            let text = other.to_string();
            if text.trim().is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                text
            }
        }
    }
}

/// The `message` of a structured error body, or [`UNKNOWN_ERROR`]
pub fn message_from_body(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|response| response.message)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}
