//! Closed set of sound names known to the player
//!
//! Every playable asset is named by one of these enums, so a misspelled sound
//! is a compile error instead of a silent runtime miss. Each name has a stable
//! string key used for asset file names, configuration and logs.

use crate::types::Scene;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Background music tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MusicTrack {
    Lullaby,
}

impl MusicTrack {
    pub const ALL: [MusicTrack; 1] = [MusicTrack::Lullaby];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lullaby => "lullaby",
        }
    }
}

/// Looping ambient layers tied to a page's scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmbientSound {
    Rain,
    Crickets,
    Wind,
    Waves,
    Birds,
    Owl,
    Fireplace,
    Stream,
    Night,
}

impl AmbientSound {
    pub const ALL: [AmbientSound; 9] = [
        AmbientSound::Rain,
        AmbientSound::Crickets,
        AmbientSound::Wind,
        AmbientSound::Waves,
        AmbientSound::Birds,
        AmbientSound::Owl,
        AmbientSound::Fireplace,
        AmbientSound::Stream,
        AmbientSound::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::Crickets => "crickets",
            Self::Wind => "wind",
            Self::Waves => "waves",
            Self::Birds => "birds",
            Self::Owl => "owl",
            Self::Fireplace => "fireplace",
            Self::Stream => "stream",
            Self::Night => "night",
        }
    }

    /// Default ambient layers for a scene
    pub fn defaults_for(scene: Scene) -> BTreeSet<AmbientSound> {
        let sounds: &[AmbientSound] = match scene {
            Scene::Forest => &[Self::Birds, Self::Wind],
            Scene::Stars => &[Self::Crickets, Self::Night],
            Scene::Moon => &[Self::Owl, Self::Night],
            Scene::Clouds => &[Self::Wind, Self::Rain],
            Scene::Animals => &[Self::Crickets, Self::Stream],
        };
        sounds.iter().copied().collect()
    }
}

/// One-shot effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundEffect {
    BedtimeStart,
    BedtimeEnd,
    PageTurn,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 3] = [
        SoundEffect::BedtimeStart,
        SoundEffect::BedtimeEnd,
        SoundEffect::PageTurn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BedtimeStart => "bedtimeStart",
            Self::BedtimeEnd => "bedtimeEnd",
            Self::PageTurn => "pageTurn",
        }
    }
}

/// Any sound the player can load, regardless of the channel that plays it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoundName {
    Music(MusicTrack),
    Ambient(AmbientSound),
    Effect(SoundEffect),
}

impl SoundName {
    /// Stable key, e.g. `"rain"` or `"bedtimeStart"`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Music(track) => track.as_str(),
            Self::Ambient(sound) => sound.as_str(),
            Self::Effect(effect) => effect.as_str(),
        }
    }

    /// Asset file name for this sound with the given extension
    pub fn asset_file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.as_str(), extension.trim_start_matches('.'))
    }

    /// Iterates over every known sound name
    pub fn all() -> impl Iterator<Item = SoundName> {
        MusicTrack::ALL
            .into_iter()
            .map(SoundName::Music)
            .chain(AmbientSound::ALL.into_iter().map(SoundName::Ambient))
            .chain(SoundEffect::ALL.into_iter().map(SoundName::Effect))
    }
}

impl fmt::Display for SoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AmbientSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown sound key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sound name: '{0}'")]
pub struct UnknownSoundName(pub String);

impl FromStr for SoundName {
    type Err = UnknownSoundName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        SoundName::all()
            .find(|name| name.as_str().eq_ignore_ascii_case(key))
            .ok_or_else(|| UnknownSoundName(s.to_string()))
    }
}

impl FromStr for AmbientSound {
    type Err = UnknownSoundName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<SoundName>()? {
            SoundName::Ambient(sound) => Ok(sound),
            _ => Err(UnknownSoundName(s.to_string())),
        }
    }
}

impl From<MusicTrack> for SoundName {
    fn from(track: MusicTrack) -> Self {
        Self::Music(track)
    }
}

impl From<AmbientSound> for SoundName {
    fn from(sound: AmbientSound) -> Self {
        Self::Ambient(sound)
    }
}

impl From<SoundEffect> for SoundName {
    fn from(effect: SoundEffect) -> Self {
        Self::Effect(effect)
    }
}
