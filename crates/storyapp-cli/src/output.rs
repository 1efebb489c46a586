//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::Local;
use serde_json::json;

use storyapp_core::{SessionRecord, StoryItem};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single story
    pub fn print_story(&self, story: &StoryItem) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", story.id);
                println!("Author:   {}", story.name);
                println!("Created:  {}", created(story));
                if let (Some(lat), Some(lon)) = (story.lat, story.lon) {
                    println!("Location: {:.5}, {:.5}", lat, lon);
                }
                println!("Photo:    {}", story.photo_url);
                println!();
                println!("{}", story.description);
            }
            OutputFormat::Json => print_json(story),
            OutputFormat::Quiet => println!("{}", story.id),
        }
    }

    /// Print a list of stories
    pub fn print_stories(&self, stories: &[StoryItem]) {
        match self.format {
            OutputFormat::Human => {
                if stories.is_empty() {
                    println!("No stories found.");
                    return;
                }
                for story in stories {
                    println!(
                        "{} | {} | {} | {}",
                        story.id,
                        truncate(&story.name, 20),
                        created(story),
                        truncate_line(&story.description, 45)
                    );
                }
                println!("\n{} story(ies)", stories.len());
            }
            OutputFormat::Json => print_json(stories),
            OutputFormat::Quiet => {
                for story in stories {
                    println!("{}", story.id);
                }
            }
        }
    }

    /// Print stories with their coordinates
    pub fn print_locations(&self, stories: &[StoryItem]) {
        match self.format {
            OutputFormat::Human => {
                if stories.is_empty() {
                    println!("No stories with a location.");
                    return;
                }
                for story in stories {
                    let (lat, lon) = (story.lat.unwrap_or_default(), story.lon.unwrap_or_default());
                    println!(
                        "{:>10.5} {:>11.5} | {} | {}",
                        lat,
                        lon,
                        truncate(&story.name, 20),
                        truncate_line(&story.description, 40)
                    );
                }
                println!("\n{} story(ies) on the map", stories.len());
            }
            OutputFormat::Json => {
                let markers: Vec<_> = stories
                    .iter()
                    .map(|s| json!({"id": s.id, "name": s.name, "lat": s.lat, "lon": s.lon}))
                    .collect();
                print_json(&markers);
            }
            OutputFormat::Quiet => {
                for story in stories {
                    println!("{}", story.id);
                }
            }
        }
    }

    /// Print the current session, never the token
    pub fn print_session(&self, session: &SessionRecord) {
        match self.format {
            OutputFormat::Human => {
                if session.is_logged_in {
                    println!("Logged in as {}", session.email);
                } else {
                    println!("Not logged in.");
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    json!({"email": session.email, "is_logged_in": session.is_logged_in})
                );
            }
            OutputFormat::Quiet => {
                if session.is_logged_in {
                    println!("{}", session.email);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!("{}", json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (not in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to encode JSON: {}", e),
    }
}

/// Creation time in local time, or as sent if unparseable
fn created(story: &StoryItem) -> String {
    story
        .created_at_utc()
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| story.created_at.clone())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
