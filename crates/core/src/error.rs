//! Error types and recovery classification for bedtime playback
//!
//! Failures during a session fall into four kinds, each with a severity tier
//! and a recovery action that tells the orchestrator how to react:
//! - **ResourceLoadFailure**: an asset could not be loaded after retries; the layer is skipped
//! - **BackendPlaybackFailure**: the audio backend rejected a call; the name is treated as stopped
//! - **InvalidTransition**: a control was used in a state that does not support it; ignored
//! - **SetupFailure**: a session cannot start at all; the session is marked failed

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryAction {
    /// Continue the session without the failing audio layer
    DisableLayer,
    /// Nothing to recover; the call is dropped
    Ignore,
    /// The session must be reset before it can be used again
    ResetSession,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisableLayer => write!(f, "Continuing without this sound"),
            Self::Ignore => write!(f, "Ignoring request"),
            Self::ResetSession => write!(f, "Session reset required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Nothing was lost; the caller may simply try again
    Recoverable,
    /// A feature is unavailable but the session continues
    Degraded,
    /// The session cannot continue
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Failure categories observed during a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ResourceLoadFailure,
    BackendPlaybackFailure,
    InvalidTransition,
    SetupFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceLoadFailure => "ResourceLoadFailure",
            Self::BackendPlaybackFailure => "BackendPlaybackFailure",
            Self::InvalidTransition => "InvalidTransition",
            Self::SetupFailure => "SetupFailure",
        }
    }

    /// Returns the severity level of this kind of failure
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ResourceLoadFailure | Self::BackendPlaybackFailure => ErrorSeverity::Degraded,
            Self::InvalidTransition => ErrorSeverity::Recoverable,
            Self::SetupFailure => ErrorSeverity::Fatal,
        }
    }

    /// Returns the recommended recovery action for this kind of failure
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::ResourceLoadFailure | Self::BackendPlaybackFailure => {
                RecoveryAction::DisableLayer
            }
            Self::InvalidTransition => RecoveryAction::Ignore,
            Self::SetupFailure => RecoveryAction::ResetSession,
        }
    }

    /// Only fatal failures reach the presentation layer
    pub fn is_user_visible(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error recorded on a session for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    /// Component that observed the failure, e.g. `"PlaybackOrchestrator.start"`
    pub source: String,
    pub occurred_at: Timestamp,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: source.into(),
            occurred_at: Timestamp::now(),
        }
    }

    /// Returns a user-friendly message suitable for display
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::SetupFailure => {
                format!("The story could not start: {}. Reset to try again.", self.message)
            }
            ErrorKind::ResourceLoadFailure | ErrorKind::BackendPlaybackFailure => {
                "Some sounds are unavailable. The story continues without them.".to_string()
            }
            ErrorKind::InvalidTransition => "That action is not available right now.".to_string(),
        }
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.source, self.message)
    }
}

/// Errors building or validating a story
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryError {
    /// A story needs at least one page
    #[error("Story has no pages")]
    NoPages,

    /// Story title is blank
    #[error("Story title must not be empty")]
    EmptyTitle,

    /// Page or target duration must be positive
    #[error("Invalid duration: {0}s (must be greater than zero)")]
    InvalidDuration(u32),

    /// Page durations do not fit in the session clock
    #[error("Total story duration overflows")]
    DurationOverflow,

    /// Story template data is unusable
    #[error("Invalid story template: {0}")]
    InvalidTemplate(String),
}
