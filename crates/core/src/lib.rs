//! Core domain model for bedtime story playback
//!
//! Stories, pages, the closed set of sound names, the session error taxonomy
//! and the error sink shared by every other crate.

pub mod error;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorDescriptor, ErrorKind, ErrorSeverity, RecoveryAction, StoryError};
pub use telemetry::{ErrorSink, LogErrorSink, RecordingErrorSink, SinkEntry, SinkLevel};
pub use types::{
    format_clock, AmbientSound, Mood, MusicTrack, PageId, Scene, SoundEffect, SoundName, StoryId,
    StoryModel, StoryPage, Timestamp, UnknownSoundName, Validator,
};
