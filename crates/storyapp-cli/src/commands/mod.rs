//! Command handlers

pub mod account;
pub mod config;
pub mod stories;

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::watch;

use storyapp_core::{HttpStoryApi, Outcome, Repository, StorageError, UNKNOWN_ERROR};

pub type AppRepository = Arc<Repository<HttpStoryApi>>;

/// The value a view model settled on, or its error as a failure
pub fn settled<T: Clone>(rx: &watch::Receiver<Option<Outcome<T>>>) -> Result<T> {
    let outcome = rx.borrow().clone();
    match outcome {
        Some(Outcome::Success(value)) => Ok(value),
        Some(Outcome::Error(message)) => bail!(message),
        Some(Outcome::Loading) | None => bail!(UNKNOWN_ERROR),
    }
}

/// Fail unless a user is logged in
pub fn require_login(repository: &AppRepository) -> Result<()> {
    if !repository.current_session().is_logged_in {
        bail!("Not logged in. Run `storyapp login` first.");
    }
    Ok(())
}

/// What the user can do about a storage failure, if anything
pub fn storage_hint(error: &anyhow::Error) -> Option<&'static str> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion)
}
