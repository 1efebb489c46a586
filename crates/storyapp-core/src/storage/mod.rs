//! Storage layer
//!
//! Local state kept between runs.
//!
//! - **Session**: the logged-in user, a small TOML file
//! - **Story cache**: SQLite mirror of fetched feed pages plus their
//!   paging bookmarks; always rebuildable from the service

pub mod cache;
pub mod error;
pub mod schema;
pub mod session;

pub use cache::{CachedStory, StoryCache, StoryChunks};
pub use error::{StorageError, StorageResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use session::SessionStore;
