//! Story command handlers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use storyapp_core::{
    AddStoryViewModel, DetailStoryViewModel, LoadStatus, MainViewModel, MapsViewModel,
    UploadRequest,
};

use super::{require_login, settled, AppRepository};
use crate::output::Output;

/// List the feed, loading pages until `pages` are cached or the feed ends
///
/// Pages already in the cache count toward `pages`. Stories come from the
/// local cache; a failed load is reported but the cached list is still shown.
pub async fn list(
    repository: AppRepository,
    pages: u32,
    refresh: bool,
    output: &Output,
) -> Result<()> {
    require_login(&repository)?;
    let vm = MainViewModel::new(repository).await;
    let pager = vm.stories();

    if refresh || pager.snapshot().items.is_empty() {
        vm.refresh().await?;
    }

    while pager.loaded_pages().await < pages {
        let states = pager.snapshot().load_states;
        if states.refresh.is_error() || states.append.is_error() || states.append.end_reached() {
            break;
        }
        vm.load_more().await?;
    }

    let snapshot = pager.snapshot();
    debug!("Listing {} cached stories", snapshot.items.len());
    for status in [&snapshot.load_states.refresh, &snapshot.load_states.append] {
        if let LoadStatus::Error(message) = status {
            output.warn(&format!("Could not load stories: {}", message));
        }
    }
    output.print_stories(&snapshot.items);
    Ok(())
}

/// Show one story
pub async fn show(repository: AppRepository, id: String, output: &Output) -> Result<()> {
    require_login(&repository)?;
    let vm = DetailStoryViewModel::new(repository);

    vm.load(&id).await?;

    let story = settled(&vm.story())?;
    output.print_story(&story);
    Ok(())
}

/// Upload a photo as a new story
pub async fn upload(
    repository: AppRepository,
    photo: PathBuf,
    description: String,
    location: Option<(f64, f64)>,
    output: &Output,
) -> Result<()> {
    require_login(&repository)?;

    let image = std::fs::read(&photo)
        .with_context(|| format!("Failed to read photo: {:?}", photo))?;
    let file_name = photo
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo.jpg".to_string());

    let mut request =
        UploadRequest::new(image, file_name, description).with_mime_type(photo_mime(&photo));
    if let Some((lat, lon)) = location {
        request = request.with_location(lat, lon);
    }

    let vm = AddStoryViewModel::new(Arc::clone(&repository));
    vm.upload(request).await?;

    let message = settled(&vm.upload_result())?;
    output.success(&message);
    Ok(())
}

/// Content type for a photo, judged by its extension
fn photo_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

/// List stories that carry a location
pub async fn map(repository: AppRepository, output: &Output) -> Result<()> {
    require_login(&repository)?;
    let vm = MapsViewModel::new(repository);

    vm.load().await?;

    let response = settled(&vm.stories())?;
    output.print_locations(&response.list_story);
    Ok(())
}
