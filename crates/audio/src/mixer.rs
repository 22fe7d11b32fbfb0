//! Software mixer for decoded clips

use crate::backend::{clamp_volume, PlayMode, VoiceId};
use crate::decoder::DecodedClip;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
struct Voice {
    clip: Arc<DecodedClip>,
    mode: PlayMode,
    volume: f32,
    /// Next frame to read from the clip
    cursor: usize,
}

/// Sums every running voice into one interleaved output buffer
///
/// Clips are read at their own sample rate; no resampling happens here.
#[derive(Debug)]
pub struct Mixer {
    sample_rate: u32,
    channels: usize,
    voices: BTreeMap<VoiceId, Voice>,
}

impl Mixer {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            voices: BTreeMap::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn add_voice(&mut self, id: VoiceId, clip: Arc<DecodedClip>, mode: PlayMode, volume: f32) {
        self.voices.insert(
            id,
            Voice {
                clip,
                mode,
                volume: clamp_volume(volume),
                cursor: 0,
            },
        );
    }

    pub fn remove_voice(&mut self, id: VoiceId) -> bool {
        self.voices.remove(&id).is_some()
    }

    /// Removes every voice playing `clip`
    pub fn remove_clip(&mut self, clip: &Arc<DecodedClip>) -> usize {
        let before = self.voices.len();
        self.voices.retain(|_, voice| !Arc::ptr_eq(&voice.clip, clip));
        before - self.voices.len()
    }

    pub fn set_volume(&mut self, id: VoiceId, volume: f32) -> bool {
        match self.voices.get_mut(&id) {
            Some(voice) => {
                voice.volume = clamp_volume(volume);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.voices.contains_key(&id)
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Mixes into `out` and returns the number of frames written
    ///
    /// Looped voices wrap to the start. One-shots that run out are retired.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        let frames = out.len() / self.channels;
        let channels = self.channels;

        let mut finished = Vec::new();
        for (id, voice) in self.voices.iter_mut() {
            let clip_frames = voice.clip.frames();
            if clip_frames == 0 {
                finished.push(*id);
                continue;
            }
            let clip_channels = voice.clip.channels;

            for frame in 0..frames {
                if voice.cursor >= clip_frames {
                    match voice.mode {
                        PlayMode::Looped => voice.cursor = 0,
                        PlayMode::OneShot => {
                            finished.push(*id);
                            break;
                        }
                    }
                }

                let base = voice.cursor * clip_channels;
                for ch in 0..channels {
                    // Mono clips feed every output channel
                    let src = base + ch.min(clip_channels - 1);
                    out[frame * channels + ch] += voice.clip.samples[src] * voice.volume;
                }
                voice.cursor += 1;
            }

            if voice.mode == PlayMode::OneShot && voice.cursor >= clip_frames {
                finished.push(*id);
            }
        }

        finished.dedup();
        for id in finished {
            self.voices.remove(&id);
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        frames
    }
}
