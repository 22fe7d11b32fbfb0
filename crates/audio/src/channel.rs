//! Playback lanes
//!
//! A channel owns the voices it started and tracks them by sound name. Its
//! operations never fail: backend errors are reported to the error sink and
//! the channel carries on as if the call had succeeded.

use crate::backend::{clamp_volume, AudioBackend, PlayMode, VoiceId};
use crate::error::AudioError;
use crate::loader::ResourceLoader;
use bedtime_core::{ErrorKind, ErrorSink, SoundName};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Which lane a channel drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// One looped track at a time
    Music,
    /// Any number of looped layers
    Ambient,
    /// Fire-and-forget one-shots
    Effects,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Music => "music",
            ChannelKind::Ambient => "ambient",
            ChannelKind::Effects => "effects",
        }
    }

    pub fn play_mode(&self) -> PlayMode {
        match self {
            ChannelKind::Music | ChannelKind::Ambient => PlayMode::Looped,
            ChannelKind::Effects => PlayMode::OneShot,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct ChannelState {
    active: BTreeMap<SoundName, VoiceId>,
    /// Names whose play is in flight; removing a name here cancels it
    pending: BTreeSet<SoundName>,
    volume: f32,
}

/// One playback lane sharing a single volume
pub struct AudioChannel {
    kind: ChannelKind,
    loader: Arc<ResourceLoader>,
    backend: Arc<dyn AudioBackend>,
    sink: Arc<dyn ErrorSink>,
    state: Mutex<ChannelState>,
}

impl AudioChannel {
    pub fn new(
        kind: ChannelKind,
        loader: Arc<ResourceLoader>,
        backend: Arc<dyn AudioBackend>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            kind,
            loader,
            backend,
            sink,
            state: Mutex::new(ChannelState {
                active: BTreeMap::new(),
                pending: BTreeSet::new(),
                volume: 1.0,
            }),
        }
    }

    /// Sets the starting volume
    pub fn with_volume(self, volume: f32) -> Self {
        self.lock().volume = clamp_volume(volume);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    /// Names currently playing, sorted
    pub fn active_names(&self) -> Vec<SoundName> {
        self.lock().active.keys().copied().collect()
    }

    pub fn is_active(&self, sound: SoundName) -> bool {
        self.lock().active.contains_key(&sound)
    }

    /// True when nothing is playing and nothing is about to
    pub fn is_silent(&self) -> bool {
        let state = self.lock();
        state.active.is_empty() && state.pending.is_empty()
    }

    /// Starts `sound` at the channel volume
    ///
    /// No-op when the name is already active or being started. On the music
    /// channel any other track is stopped first.
    pub async fn play(&self, sound: SoundName) {
        let mode = self.kind.play_mode();
        if mode == PlayMode::OneShot {
            self.play_one_shot(sound).await;
            return;
        }

        let displaced = {
            let mut state = self.lock();
            if state.active.contains_key(&sound) || state.pending.contains(&sound) {
                return;
            }
            let displaced: Vec<(SoundName, VoiceId)> = if self.kind == ChannelKind::Music {
                state.pending.clear();
                std::mem::take(&mut state.active).into_iter().collect()
            } else {
                Vec::new()
            };
            state.pending.insert(sound);
            displaced
        };

        for (name, voice) in displaced {
            self.stop_voice(name, voice).await;
        }

        let Some(handle) = self.loader.load(sound).await else {
            self.lock().pending.remove(&sound);
            return;
        };

        let volume = self.volume();
        let voice = match self.backend.play(&handle, mode, volume).await {
            Ok(voice) => voice,
            Err(e) => {
                self.lock().pending.remove(&sound);
                self.report(&e, sound, "play");
                return;
            }
        };

        let cancelled = {
            let mut state = self.lock();
            if state.pending.remove(&sound) {
                state.active.insert(sound, voice);
                false
            } else {
                true
            }
        };

        if cancelled {
            log::debug!("{} play of '{}' cancelled while starting", self.kind, sound);
            self.stop_voice(sound, voice).await;
        } else {
            log::debug!("{} playing '{}' on {}", self.kind, sound, voice);
        }
    }

    async fn play_one_shot(&self, sound: SoundName) {
        let Some(handle) = self.loader.load(sound).await else {
            return;
        };
        let volume = self.volume();
        match self.backend.play(&handle, PlayMode::OneShot, volume).await {
            Ok(voice) => log::debug!("{} fired '{}' on {}", self.kind, sound, voice),
            Err(e) => self.report(&e, sound, "play"),
        }
    }

    /// Stops `sound`; no-op when it is not active
    pub async fn stop(&self, sound: SoundName) {
        let voice = {
            let mut state = self.lock();
            state.pending.remove(&sound);
            state.active.remove(&sound)
        };
        if let Some(voice) = voice {
            self.stop_voice(sound, voice).await;
        }
    }

    /// Stops everything; the active set is empty afterwards even if stops fail
    pub async fn stop_all(&self) {
        let voices: Vec<(SoundName, VoiceId)> = {
            let mut state = self.lock();
            state.pending.clear();
            std::mem::take(&mut state.active).into_iter().collect()
        };
        if voices.is_empty() {
            return;
        }
        log::debug!("{} stopping {} voices", self.kind, voices.len());
        join_all(
            voices
                .into_iter()
                .map(|(sound, voice)| self.stop_voice(sound, voice)),
        )
        .await;
    }

    /// Swaps the playing set for `sounds`
    ///
    /// Every outgoing name is stopped, including names that stay, and every
    /// incoming name is started. Per name the stop completes before the start;
    /// across names the stops and starts run together.
    pub async fn replace_all(&self, sounds: &BTreeSet<SoundName>) {
        let outgoing: Vec<(SoundName, VoiceId)> = {
            let mut state = self.lock();
            state.pending.retain(|name| sounds.contains(name));
            std::mem::take(&mut state.active).into_iter().collect()
        };

        let mut tasks: Vec<BoxFuture<'_, ()>> = Vec::new();
        let mut restarted = BTreeSet::new();
        for (sound, voice) in outgoing {
            if sounds.contains(&sound) {
                restarted.insert(sound);
                tasks.push(
                    async move {
                        self.stop_voice(sound, voice).await;
                        self.play(sound).await;
                    }
                    .boxed(),
                );
            } else {
                tasks.push(self.stop_voice(sound, voice).boxed());
            }
        }
        for &sound in sounds.iter().filter(|s| !restarted.contains(s)) {
            tasks.push(self.play(sound).boxed());
        }

        join_all(tasks).await;
    }

    /// Clamps `volume`, applies it to every active voice and keeps it for later plays
    pub async fn set_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        let voices: Vec<(SoundName, VoiceId)> = {
            let mut state = self.lock();
            state.volume = volume;
            state.active.iter().map(|(s, v)| (*s, *v)).collect()
        };

        join_all(voices.into_iter().map(|(sound, voice)| async move {
            if let Err(e) = self.backend.set_volume(voice, volume).await {
                self.report(&e, sound, "set_volume");
            }
        }))
        .await;
    }

    async fn stop_voice(&self, sound: SoundName, voice: VoiceId) {
        if let Err(e) = self.backend.stop(voice).await {
            self.report(&e, sound, "stop");
        }
    }

    fn report(&self, error: &AudioError, sound: SoundName, operation: &str) {
        self.sink.log_error(
            error,
            "AudioChannel",
            Some(&json!({
                "kind": ErrorKind::BackendPlaybackFailure.as_str(),
                "channel": self.kind.as_str(),
                "sound": sound.as_str(),
                "operation": operation,
            })),
        );
    }
}

impl fmt::Debug for AudioChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("AudioChannel")
            .field("kind", &self.kind)
            .field("active", &state.active)
            .field("volume", &state.volume)
            .finish()
    }
}
