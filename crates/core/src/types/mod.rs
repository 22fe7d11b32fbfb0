//! Domain types for bedtime stories
//!
//! - `story`: stories, pages, moods and scenes
//! - `sound`: the closed set of playable sound names
//! - `common`: timestamps and shared helpers

mod common;
mod sound;
mod story;

pub use common::{format_clock, Timestamp, Validator};
pub use sound::{AmbientSound, MusicTrack, SoundEffect, SoundName, UnknownSoundName};
pub use story::{Mood, PageId, Scene, StoryId, StoryModel, StoryPage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_types_are_exported() {
        let _story_id: StoryId = StoryId::new();
        let _page_id: PageId = PageId::new();
        let _sound: SoundName = AmbientSound::Rain.into();
    }
}
