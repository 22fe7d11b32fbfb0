//! Bedtime story playback
//!
//! [`PlaybackOrchestrator`] owns a [`PlaybackSession`] and moves it through
//! `Idle -> Loading -> Playing <-> Paused -> Completed`, driving the music,
//! ambient and effects channels as pages turn. A one-second countdown runs
//! while playing. Failures below the orchestrator are reported to an error
//! sink and never reach the caller; only a start without a story ends in
//! `Failed`.

mod error;
mod orchestrator;
mod session;
mod settings;
mod timer;

pub use error::PlaybackError;
pub use orchestrator::{PlaybackOrchestrator, PlaybackOrchestratorBuilder, DEFAULT_TICK_INTERVAL};
pub use session::{PlaybackSession, SessionPhase, SessionSettings};
pub use settings::{ConfigSettingsStore, InMemorySettingsStore, SettingsStore};
