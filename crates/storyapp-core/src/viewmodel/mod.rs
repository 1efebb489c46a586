//! Per-screen view models
//!
//! A view model runs repository calls on its own [`ViewModelScope`] and
//! republishes the results through `watch` channels. Front-ends subscribe
//! to the channels; every operation also returns the task handle so a
//! caller can wait for it to settle.

mod auth;
mod home;
mod scope;
mod story;

pub use auth::{LoginViewModel, SignupViewModel};
pub use home::MainViewModel;
pub use scope::ViewModelScope;
pub use story::{AddStoryViewModel, DetailStoryViewModel, MapsViewModel};

#[cfg(test)]
pub(crate) use test_support::{test_repository, test_repository_with};
