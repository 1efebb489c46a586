//! Storyapp Core Library
//!
//! This crate provides the core of Storyapp, a client for a photo-story
//! sharing service: accounts, a paginated feed cached locally for offline
//! reading, story detail, uploads and a geotagged view.
//!
//! # Architecture
//!
//! - **Remote API**: the service is the source of truth for stories
//! - **SQLite cache**: the feed is mirrored page by page and served from disk
//! - **Session file**: the logged-in user survives restarts
//!
//! Screens read the feed only from the cache; the paging mediator fills it.
//!
//! # Quick Start
//!
//! ```text
//! let repository = Arc::new(Repository::open(&Config::load()?)?);
//!
//! // Log in
//! let login = LoginViewModel::new(Arc::clone(&repository));
//! login.login("ana@example.com", "secret").await?;
//!
//! // Read the feed
//! let main = MainViewModel::new(repository).await;
//! main.refresh().await?;
//! let stories = main.stories().snapshot().items;
//! ```
//!
//! # Modules
//!
//! - `repository`: Single entry point for screens
//! - `viewmodel`: Observable per-screen state
//! - `paging`: Feed pagination into the local cache
//! - `api`: Story service binding
//! - `storage`: Session file and SQLite story cache
//! - `models`: Stories, sessions and wire shapes
//! - `config`: Application configuration

pub mod api;
pub mod config;
pub mod models;
pub mod outcome;
pub mod paging;
pub mod repository;
pub mod storage;
pub mod viewmodel;

pub use api::{ApiError, HttpStoryApi, StoryApi};
pub use config::Config;
pub use models::{SessionRecord, StoryItem, StoryListResponse, UploadRequest};
pub use outcome::Outcome;
pub use paging::{LoadStatus, PagingSnapshot, StoryPager};
pub use repository::{Repository, UNKNOWN_ERROR};
pub use storage::{SessionStore, StorageError, StoryCache};
pub use viewmodel::{
    AddStoryViewModel, DetailStoryViewModel, LoginViewModel, MainViewModel, MapsViewModel,
    SignupViewModel,
};
