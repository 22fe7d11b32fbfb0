//! Story and page domain models

use crate::error::StoryError;
use crate::types::{AmbientSound, Validator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(Uuid);

impl StoryId {
    /// Creates a new random StoryId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a StoryId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for StoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Emotional tone of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Peaceful,
    Dreamy,
    Calm,
    Gentle,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Peaceful, Mood::Dreamy, Mood::Calm, Mood::Gentle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Peaceful => "peaceful",
            Self::Dreamy => "dreamy",
            Self::Calm => "calm",
            Self::Gentle => "gentle",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual setting of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    Forest,
    Stars,
    Moon,
    Clouds,
    Animals,
}

impl Scene {
    pub const ALL: [Scene; 5] = [
        Scene::Forest,
        Scene::Stars,
        Scene::Moon,
        Scene::Clouds,
        Scene::Animals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forest => "forest",
            Self::Stars => "stars",
            Self::Moon => "moon",
            Self::Clouds => "clouds",
            Self::Animals => "animals",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One narrative unit of a story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPage")]
pub struct StoryPage {
    id: PageId,
    text: String,
    mood: Mood,
    scene: Scene,
    duration_seconds: u32,
    ambient_sounds: BTreeSet<AmbientSound>,
}

impl StoryPage {
    /// Creates a page using the scene's default ambient sounds
    pub fn new(
        text: impl Into<String>,
        mood: Mood,
        scene: Scene,
        duration_seconds: u32,
    ) -> Result<Self, StoryError> {
        Self::with_ambient_sounds(
            text,
            mood,
            scene,
            duration_seconds,
            AmbientSound::defaults_for(scene),
        )
    }

    /// Creates a page with an explicit ambient sound set
    pub fn with_ambient_sounds(
        text: impl Into<String>,
        mood: Mood,
        scene: Scene,
        duration_seconds: u32,
        ambient_sounds: BTreeSet<AmbientSound>,
    ) -> Result<Self, StoryError> {
        let page = Self {
            id: PageId::new(),
            text: text.into(),
            mood,
            scene,
            duration_seconds,
            ambient_sounds,
        };
        page.check()?;
        Ok(page)
    }

    fn check(&self) -> Result<(), StoryError> {
        if self.duration_seconds == 0 {
            return Err(StoryError::InvalidDuration(0));
        }
        Ok(())
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn ambient_sounds(&self) -> &BTreeSet<AmbientSound> {
        &self.ambient_sounds
    }
}

impl Validator for StoryPage {
    fn validate(&self) -> Result<(), Vec<String>> {
        match self.check() {
            Ok(()) => Ok(()),
            Err(e) => Err(vec![e.to_string()]),
        }
    }
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default)]
    id: Option<PageId>,
    text: String,
    mood: Mood,
    scene: Scene,
    duration_seconds: u32,
    #[serde(default)]
    ambient_sounds: Option<BTreeSet<AmbientSound>>,
}

impl TryFrom<RawPage> for StoryPage {
    type Error = StoryError;

    fn try_from(raw: RawPage) -> Result<Self, Self::Error> {
        let sounds = raw
            .ambient_sounds
            .unwrap_or_else(|| AmbientSound::defaults_for(raw.scene));
        let mut page =
            StoryPage::with_ambient_sounds(raw.text, raw.mood, raw.scene, raw.duration_seconds, sounds)?;
        if let Some(id) = raw.id {
            page.id = id;
        }
        Ok(page)
    }
}

/// Immutable description of a story
///
/// `total_duration_seconds` is always derived from the pages; any change to the
/// page list produces a new model with a recomputed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStory")]
pub struct StoryModel {
    id: StoryId,
    title: String,
    pages: Vec<StoryPage>,
    total_duration_seconds: u32,
    recommended_mood: Mood,
    recommended_scene: Scene,
}

impl StoryModel {
    /// Creates a story, deriving the recommended mood and scene from its pages
    pub fn new(title: impl Into<String>, pages: Vec<StoryPage>) -> Result<Self, StoryError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(StoryError::EmptyTitle);
        }
        let first = pages.first().ok_or(StoryError::NoPages)?;
        let (mood, scene) = (first.mood, first.scene);

        let mut story = Self {
            id: StoryId::new(),
            title,
            total_duration_seconds: 0,
            recommended_mood: mood,
            recommended_scene: scene,
            pages,
        };
        story.total_duration_seconds = story.sum_durations()?;
        story.recommended_mood = dominant(story.pages.iter().map(|p| p.mood)).unwrap_or(mood);
        story.recommended_scene = dominant(story.pages.iter().map(|p| p.scene)).unwrap_or(scene);
        Ok(story)
    }

    /// Overrides the recommended mood and scene
    pub fn with_recommendation(mut self, mood: Mood, scene: Scene) -> Self {
        self.recommended_mood = mood;
        self.recommended_scene = scene;
        self
    }

    /// Returns a copy of this story with a new page list and a recomputed total
    pub fn with_pages(&self, pages: Vec<StoryPage>) -> Result<Self, StoryError> {
        if pages.is_empty() {
            return Err(StoryError::NoPages);
        }
        let mut story = Self {
            id: self.id,
            title: self.title.clone(),
            pages,
            total_duration_seconds: 0,
            recommended_mood: self.recommended_mood,
            recommended_scene: self.recommended_scene,
        };
        story.total_duration_seconds = story.sum_durations()?;
        Ok(story)
    }

    fn sum_durations(&self) -> Result<u32, StoryError> {
        self.pages.iter().try_fold(0u32, |total, page| {
            page.check()?;
            total
                .checked_add(page.duration_seconds)
                .ok_or(StoryError::DurationOverflow)
        })
    }

    pub fn id(&self) -> StoryId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pages(&self) -> &[StoryPage] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&StoryPage> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn last_page_index(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    pub fn total_duration_seconds(&self) -> u32 {
        self.total_duration_seconds
    }

    pub fn recommended_mood(&self) -> Mood {
        self.recommended_mood
    }

    pub fn recommended_scene(&self) -> Scene {
        self.recommended_scene
    }

    /// Seconds from the start of the story to the start of `index`
    pub fn page_start_offset(&self, index: usize) -> Option<u32> {
        if index >= self.pages.len() {
            return None;
        }
        Some(self.pages[..index].iter().map(|p| p.duration_seconds).sum())
    }

    /// Index of the page being shown `elapsed` seconds into the story
    ///
    /// Elapsed time at or past the end maps to the last page.
    pub fn page_at_elapsed(&self, elapsed: u32) -> usize {
        let mut boundary = 0u32;
        for (index, page) in self.pages.iter().enumerate() {
            boundary = boundary.saturating_add(page.duration_seconds);
            if elapsed < boundary {
                return index;
            }
        }
        self.last_page_index()
    }
}

/// Most frequent value; the earliest one wins ties
fn dominant<T: Copy + PartialEq>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    let best = counts.iter().map(|(_, c)| *c).max()?;
    counts.into_iter().find(|(_, c)| *c == best).map(|(v, _)| v)
}

impl Validator for StoryModel {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(StoryError::EmptyTitle.to_string());
        }
        if self.pages.is_empty() {
            errors.push(StoryError::NoPages.to_string());
        }
        for page in &self.pages {
            if let Err(page_errors) = page.validate() {
                errors.extend(page_errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Deserialize)]
struct RawStory {
    #[serde(default)]
    id: Option<StoryId>,
    title: String,
    pages: Vec<StoryPage>,
    #[serde(default)]
    recommended_mood: Option<Mood>,
    #[serde(default)]
    recommended_scene: Option<Scene>,
}

impl TryFrom<RawStory> for StoryModel {
    type Error = StoryError;

    fn try_from(raw: RawStory) -> Result<Self, Self::Error> {
        let mut story = StoryModel::new(raw.title, raw.pages)?;
        if let Some(id) = raw.id {
            story.id = id;
        }
        if let Some(mood) = raw.recommended_mood {
            story.recommended_mood = mood;
        }
        if let Some(scene) = raw.recommended_scene {
            story.recommended_scene = scene;
        }
        Ok(story)
    }
}
