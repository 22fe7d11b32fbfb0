//! In-memory audio backend
//!
//! Produces no sound. It records every call, keeps a table of running voices
//! and can be told to fail specific sounds, which makes it the backend of
//! choice for tests and for running sessions without an asset directory.

use crate::backend::{clamp_volume, AudioBackend, AudioResourceHandle, PlayMode, VoiceId};
use crate::error::{AudioError, AudioResult};
use async_trait::async_trait;
use bedtime_core::SoundName;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// A call observed by the simulated backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Load(SoundName),
    Play {
        sound: SoundName,
        voice: VoiceId,
        mode: PlayMode,
        volume: f32,
    },
    Stop {
        sound: SoundName,
        voice: VoiceId,
    },
    SetVolume {
        sound: SoundName,
        voice: VoiceId,
        volume: f32,
    },
    Unload(SoundName),
}

#[derive(Debug, Clone, Copy)]
enum FailurePlan {
    Times(usize),
    Always,
}

#[derive(Debug, Clone)]
struct SimVoice {
    sound: SoundName,
    volume: f32,
}

#[derive(Debug, Default)]
struct SimState {
    next_handle: u64,
    next_voice: u64,
    load_failures: HashMap<SoundName, FailurePlan>,
    play_failures: HashSet<SoundName>,
    stop_failures: HashSet<SoundName>,
    load_attempts: HashMap<SoundName, usize>,
    loaded: HashMap<u64, SoundName>,
    voices: BTreeMap<VoiceId, SimVoice>,
    events: Vec<BackendEvent>,
    load_latency: Duration,
}

/// Backend that plays nothing and remembers everything
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    state: Mutex<SimState>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load takes `latency` before resolving
    pub fn with_load_latency(self, latency: Duration) -> Self {
        self.lock().load_latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next `times` loads of `sound` fail
    pub fn fail_loads(&self, sound: SoundName, times: usize) {
        self.lock()
            .load_failures
            .insert(sound, FailurePlan::Times(times));
    }

    /// Every load of `sound` fails
    pub fn fail_always(&self, sound: SoundName) {
        self.lock().load_failures.insert(sound, FailurePlan::Always);
    }

    /// Every play of `sound` is rejected
    pub fn fail_play(&self, sound: SoundName) {
        self.lock().play_failures.insert(sound);
    }

    /// Every stop of a `sound` voice is rejected; the voice keeps running
    pub fn fail_stop(&self, sound: SoundName) {
        self.lock().stop_failures.insert(sound);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.load_failures.clear();
        state.play_failures.clear();
        state.stop_failures.clear();
    }

    /// All calls seen so far, oldest first
    pub fn events(&self) -> Vec<BackendEvent> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    /// Number of load calls for `sound`, failed ones included
    pub fn load_attempts(&self, sound: SoundName) -> usize {
        self.lock().load_attempts.get(&sound).copied().unwrap_or(0)
    }

    /// Number of voices ever started for `sound`
    pub fn play_count(&self, sound: SoundName) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, BackendEvent::Play { sound: s, .. } if *s == sound))
            .count()
    }

    /// Sounds with a running looped voice, sorted
    pub fn playing(&self) -> Vec<SoundName> {
        let mut sounds: Vec<SoundName> = self.lock().voices.values().map(|v| v.sound).collect();
        sounds.sort();
        sounds
    }

    pub fn is_playing(&self, sound: SoundName) -> bool {
        self.lock().voices.values().any(|v| v.sound == sound)
    }

    /// Volume of the first running voice for `sound`
    pub fn voice_volume(&self, sound: SoundName) -> Option<f32> {
        self.lock()
            .voices
            .values()
            .find(|v| v.sound == sound)
            .map(|v| v.volume)
    }

    /// Number of resources currently loaded
    pub fn loaded_count(&self) -> usize {
        self.lock().loaded.len()
    }
}

#[async_trait]
impl AudioBackend for SimulatedBackend {
    async fn load(&self, sound: SoundName) -> AudioResult<AudioResourceHandle> {
        let latency = self.lock().load_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.events.push(BackendEvent::Load(sound));
        *state.load_attempts.entry(sound).or_insert(0) += 1;

        let fail = match state.load_failures.get(&sound).copied() {
            Some(FailurePlan::Always) => true,
            Some(FailurePlan::Times(0)) | None => false,
            Some(FailurePlan::Times(n)) => {
                state.load_failures.insert(sound, FailurePlan::Times(n - 1));
                true
            }
        };
        if fail {
            return Err(AudioError::Backend(format!("simulated load failure for '{}'", sound)));
        }

        state.next_handle += 1;
        let id = state.next_handle;
        state.loaded.insert(id, sound);
        Ok(AudioResourceHandle::new(id, sound, None))
    }

    async fn play(
        &self,
        handle: &AudioResourceHandle,
        mode: PlayMode,
        volume: f32,
    ) -> AudioResult<VoiceId> {
        let mut state = self.lock();
        if !state.loaded.contains_key(&handle.id()) {
            return Err(AudioError::UnknownHandle(handle.id()));
        }
        let sound = handle.sound();
        if state.play_failures.contains(&sound) {
            return Err(AudioError::Backend(format!("simulated play failure for '{}'", sound)));
        }

        state.next_voice += 1;
        let voice = VoiceId::new(state.next_voice);
        let volume = clamp_volume(volume);
        state.events.push(BackendEvent::Play {
            sound,
            voice,
            mode,
            volume,
        });
        // One-shots retire immediately; only looped voices keep running.
        if mode == PlayMode::Looped {
            state.voices.insert(voice, SimVoice { sound, volume });
        }
        Ok(voice)
    }

    async fn stop(&self, voice: VoiceId) -> AudioResult<()> {
        let mut state = self.lock();
        let Some(sound) = state.voices.get(&voice).map(|v| v.sound) else {
            return Ok(());
        };
        if state.stop_failures.contains(&sound) {
            return Err(AudioError::Backend(format!("simulated stop failure for '{}'", sound)));
        }
        state.voices.remove(&voice);
        state.events.push(BackendEvent::Stop { sound, voice });
        Ok(())
    }

    async fn set_volume(&self, voice: VoiceId, volume: f32) -> AudioResult<()> {
        let mut state = self.lock();
        let volume = clamp_volume(volume);
        let sound = match state.voices.get_mut(&voice) {
            Some(v) => {
                v.volume = volume;
                v.sound
            }
            None => return Err(AudioError::UnknownVoice(voice)),
        };
        state.events.push(BackendEvent::SetVolume {
            sound,
            voice,
            volume,
        });
        Ok(())
    }

    async fn unload(&self, handle: &AudioResourceHandle) -> AudioResult<()> {
        let mut state = self.lock();
        let sound = state
            .loaded
            .remove(&handle.id())
            .ok_or(AudioError::UnknownHandle(handle.id()))?;
        state.voices.retain(|_, v| v.sound != sound);
        state.events.push(BackendEvent::Unload(sound));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedtime_core::{AmbientSound, SoundEffect};

    #[tokio::test]
    async fn test_looped_voice_runs_until_stopped() {
        let backend = SimulatedBackend::new();
        let rain = SoundName::from(AmbientSound::Rain);
        let handle = backend.load(rain).await.unwrap();

        let voice = backend.play(&handle, PlayMode::Looped, 0.4).await.unwrap();
        assert_eq!(backend.playing(), vec![rain]);
        assert_eq!(backend.voice_volume(rain), Some(0.4));

        backend.stop(voice).await.unwrap();
        assert!(backend.playing().is_empty());
    }

    #[tokio::test]
    async fn test_one_shot_is_not_kept() {
        let backend = SimulatedBackend::new();
        let chime = SoundName::from(SoundEffect::BedtimeStart);
        let handle = backend.load(chime).await.unwrap();

        backend.play(&handle, PlayMode::OneShot, 1.0).await.unwrap();
        assert!(backend.playing().is_empty());
        assert_eq!(backend.play_count(chime), 1);
    }

    #[tokio::test]
    async fn test_load_failure_plan() {
        let backend = SimulatedBackend::new();
        let owl = SoundName::from(AmbientSound::Owl);
        backend.fail_loads(owl, 1);

        assert!(backend.load(owl).await.is_err());
        assert!(backend.load(owl).await.is_ok());
        assert_eq!(backend.load_attempts(owl), 2);
    }

    #[tokio::test]
    async fn test_play_requires_loaded_handle() {
        let backend = SimulatedBackend::new();
        let bogus = AudioResourceHandle::new(99, AmbientSound::Wind.into(), None);
        assert!(matches!(
            backend.play(&bogus, PlayMode::Looped, 1.0).await,
            Err(AudioError::UnknownHandle(99))
        ));
    }

    #[tokio::test]
    async fn test_unload_stops_voices() {
        let backend = SimulatedBackend::new();
        let waves = SoundName::from(AmbientSound::Waves);
        let handle = backend.load(waves).await.unwrap();
        backend.play(&handle, PlayMode::Looped, 1.0).await.unwrap();

        backend.unload(&handle).await.unwrap();
        assert!(backend.playing().is_empty());
        assert_eq!(backend.loaded_count(), 0);
    }
}
