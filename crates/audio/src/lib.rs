//! Audio layer for bedtime playback
//!
//! Resource loading with retry, the three playback channels and two
//! backends: an in-memory simulation and a symphonia-backed file mixer.

mod backend;
mod channel;
mod decoder;
mod error;
mod file_backend;
mod loader;
mod mixer;
mod simulated;

pub use backend::{clamp_volume, AudioBackend, AudioResourceHandle, PlayMode, VoiceId};
pub use channel::{AudioChannel, ChannelKind};
pub use decoder::{decode_file, DecodedClip};
pub use error::{AudioError, AudioResult};
pub use file_backend::{FileBackend, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
pub use loader::ResourceLoader;
pub use mixer::Mixer;
pub use simulated::{BackendEvent, SimulatedBackend};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _ = ChannelKind::Ambient;
        let _ = PlayMode::OneShot;
        let _ = SimulatedBackend::new();
        let _ = Mixer::new(DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS);
    }
}
