//! Contract between the channels and whatever actually produces sound

use crate::error::AudioResult;
use async_trait::async_trait;
use bedtime_core::SoundName;
use std::fmt;
use std::time::Duration;

/// How a voice plays its clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Restart from the beginning whenever the clip ends
    Looped,
    /// Play once and retire
    OneShot,
}

/// One playing instance of a loaded resource
///
/// Channels hold voices, not handles, so two channels may play the same
/// resource without interfering with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(u64);

impl VoiceId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Opaque reference to a loaded asset
///
/// Owned by the [`ResourceLoader`](crate::ResourceLoader) cache. Channels
/// borrow it to start voices and never unload it themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResourceHandle {
    id: u64,
    sound: SoundName,
    duration: Option<Duration>,
}

impl AudioResourceHandle {
    pub fn new(id: u64, sound: SoundName, duration: Option<Duration>) -> Self {
        Self {
            id,
            sound,
            duration,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sound(&self) -> SoundName {
        self.sound
    }

    /// Length of the underlying clip, when the backend knows it
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

/// Audio backend: loads assets and drives voices
///
/// Every call may suspend on I/O. Implementations report failures through
/// [`AudioError`](crate::AudioError); callers decide whether they are fatal.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Loads the asset for `sound`
    async fn load(&self, sound: SoundName) -> AudioResult<AudioResourceHandle>;

    /// Starts a new voice for a loaded resource
    async fn play(
        &self,
        handle: &AudioResourceHandle,
        mode: PlayMode,
        volume: f32,
    ) -> AudioResult<VoiceId>;

    /// Stops a voice; stopping a voice that already ended succeeds
    async fn stop(&self, voice: VoiceId) -> AudioResult<()>;

    /// Changes the volume of a playing voice
    async fn set_volume(&self, voice: VoiceId, volume: f32) -> AudioResult<()>;

    /// Releases a loaded resource and any voice still using it
    async fn unload(&self, handle: &AudioResourceHandle) -> AudioResult<()>;
}

/// Clamps a volume into `[0, 1]`, mapping NaN to silence
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
