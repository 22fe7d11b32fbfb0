// FILE: crates/audio/src/error.rs

use crate::backend::VoiceId;
use bedtime_core::SoundName;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Asset for '{sound}' not found at {path}")]
    AssetNotFound { sound: SoundName, path: PathBuf },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Unknown resource handle: {0}")]
    UnknownHandle(u64),

    #[error("Unknown voice: {0}")]
    UnknownVoice(VoiceId),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
