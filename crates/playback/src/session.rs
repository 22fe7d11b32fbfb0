//! Observable session state

use bedtime_core::{ErrorDescriptor, StoryModel, StoryPage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle phase of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    Loading,
    Playing,
    Paused,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Loading => "loading",
            SessionPhase::Playing => "playing",
            SessionPhase::Paused => "paused",
            SessionPhase::Completed => "completed",
            SessionPhase::Failed => "failed",
        }
    }

    /// Whether the session has ended and only `reset` or a new story moves it on
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preferences carried from one session to the next
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub include_music: bool,
    pub include_ambient_sounds: bool,
    pub volume: f32,
    pub auto_progress: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            include_music: true,
            include_ambient_sounds: true,
            volume: 0.7,
            auto_progress: true,
        }
    }
}

/// Snapshot of a playback session
///
/// `time_remaining_seconds` counts down the whole story while
/// `page_time_remaining_seconds` counts down the current page. Both are
/// reset by `set_story` and page navigation only touches the page clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSession {
    pub story: Option<Arc<StoryModel>>,
    pub current_page_index: usize,
    pub phase: SessionPhase,
    pub time_remaining_seconds: u32,
    pub page_time_remaining_seconds: u32,
    pub auto_progress: bool,
    pub include_music: bool,
    pub include_ambient_sounds: bool,
    pub volume: f32,
    pub last_error: Option<ErrorDescriptor>,
    /// Set by the first successful start; a later start is a resume
    pub has_started: bool,
}

impl PlaybackSession {
    /// An idle session with no story
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            story: None,
            current_page_index: 0,
            phase: SessionPhase::Idle,
            time_remaining_seconds: 0,
            page_time_remaining_seconds: 0,
            auto_progress: settings.auto_progress,
            include_music: settings.include_music,
            include_ambient_sounds: settings.include_ambient_sounds,
            volume: settings.volume,
            last_error: None,
            has_started: false,
        }
    }

    pub fn current_page(&self) -> Option<&StoryPage> {
        self.story
            .as_ref()
            .and_then(|story| story.page(self.current_page_index))
    }

    pub fn is_last_page(&self) -> bool {
        self.story
            .as_ref()
            .is_none_or(|story| self.current_page_index >= story.last_page_index())
    }

    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            include_music: self.include_music,
            include_ambient_sounds: self.include_ambient_sounds,
            volume: self.volume,
            auto_progress: self.auto_progress,
        }
    }

    /// Seconds of the story already played
    pub fn elapsed_seconds(&self) -> u32 {
        self.story.as_ref().map_or(0, |story| {
            story
                .total_duration_seconds()
                .saturating_sub(self.time_remaining_seconds)
        })
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}
