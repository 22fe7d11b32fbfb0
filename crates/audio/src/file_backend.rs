//! Backend that decodes sound assets from a directory into the software mixer

use crate::backend::{AudioBackend, AudioResourceHandle, PlayMode, VoiceId};
use crate::decoder::{decode_file, DecodedClip};
use crate::error::{AudioError, AudioResult};
use crate::mixer::Mixer;
use async_trait::async_trait;
use bedtime_core::SoundName;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Output format used when none is given
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: usize = 2;

/// Resolves `<assets_dir>/<sound>.<extension>`, decodes it with symphonia
/// and mixes the running voices in memory
///
/// The mixer is shared so an output stage can pull rendered frames. One-shot
/// voices leave the mixer when their clip ends even if nothing pulls.
pub struct FileBackend {
    assets_dir: PathBuf,
    extension: String,
    clips: Mutex<HashMap<u64, Arc<DecodedClip>>>,
    mixer: Arc<Mutex<Mixer>>,
    next_id: AtomicU64,
}

impl FileBackend {
    pub fn new(assets_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self::with_format(assets_dir, extension, DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS)
    }

    pub fn with_format(
        assets_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        sample_rate: u32,
        channels: usize,
    ) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
            clips: Mutex::new(HashMap::new()),
            mixer: Arc::new(Mutex::new(Mixer::new(sample_rate, channels))),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Where the asset for `sound` is expected
    pub fn asset_path(&self, sound: SoundName) -> PathBuf {
        self.assets_dir.join(sound.asset_file_name(&self.extension))
    }

    pub fn mixer(&self) -> Arc<Mutex<Mixer>> {
        Arc::clone(&self.mixer)
    }

    fn lock_mixer(&self) -> MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_clips(&self) -> MutexGuard<'_, HashMap<u64, Arc<DecodedClip>>> {
        self.clips.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drops a one-shot once its clip has run out, whether or not anything
    /// rendered it
    fn retire_after(&self, voice: VoiceId, length: Duration) {
        let mixer = Arc::downgrade(&self.mixer);
        tokio::spawn(async move {
            tokio::time::sleep(length).await;
            let Some(mixer) = mixer.upgrade() else {
                return;
            };
            if mixer.lock().unwrap_or_else(|e| e.into_inner()).remove_voice(voice) {
                log::trace!("Retired finished {}", voice);
            }
        });
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl AudioBackend for FileBackend {
    async fn load(&self, sound: SoundName) -> AudioResult<AudioResourceHandle> {
        let path = self.asset_path(sound);
        if !path.is_file() {
            return Err(AudioError::AssetNotFound { sound, path });
        }

        let decode_path = path.clone();
        let clip = tokio::task::spawn_blocking(move || decode_file(&decode_path))
            .await
            .map_err(|e| AudioError::Backend(format!("Decode task failed: {}", e)))??;

        let id = self.allocate_id();
        let duration = clip.duration();
        self.lock_clips().insert(id, Arc::new(clip));
        log::info!("Loaded '{}' from {} ({:.1}s)", sound, path.display(), duration.as_secs_f64());

        Ok(AudioResourceHandle::new(id, sound, Some(duration)))
    }

    async fn play(
        &self,
        handle: &AudioResourceHandle,
        mode: PlayMode,
        volume: f32,
    ) -> AudioResult<VoiceId> {
        let clip = self
            .lock_clips()
            .get(&handle.id())
            .cloned()
            .ok_or(AudioError::UnknownHandle(handle.id()))?;

        let voice = VoiceId::new(self.allocate_id());
        let length = clip.duration();
        self.lock_mixer().add_voice(voice, clip, mode, volume);
        if mode == PlayMode::OneShot {
            self.retire_after(voice, length);
        }
        Ok(voice)
    }

    async fn stop(&self, voice: VoiceId) -> AudioResult<()> {
        self.lock_mixer().remove_voice(voice);
        Ok(())
    }

    async fn set_volume(&self, voice: VoiceId, volume: f32) -> AudioResult<()> {
        if self.lock_mixer().set_volume(voice, volume) {
            Ok(())
        } else {
            Err(AudioError::UnknownVoice(voice))
        }
    }

    async fn unload(&self, handle: &AudioResourceHandle) -> AudioResult<()> {
        let clip = self
            .lock_clips()
            .remove(&handle.id())
            .ok_or(AudioError::UnknownHandle(handle.id()))?;
        let stopped = self.lock_mixer().remove_clip(&clip);
        if stopped > 0 {
            log::debug!("Unloading '{}' stopped {} voices", handle.sound(), stopped);
        }
        Ok(())
    }
}
