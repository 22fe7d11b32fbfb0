//! Error types for playback orchestration

use crate::session::SessionPhase;
use thiserror::Error;

/// Failures the orchestrator reports to its error sink
///
/// None of these are returned to callers; transitions always complete and
/// the outcome is visible on the session snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("No story set; call set_story before start")]
    NoStory,

    #[error("'{operation}' is not valid while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: SessionPhase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = PlaybackError::InvalidTransition {
            operation: "pause",
            phase: SessionPhase::Idle,
        };
        assert_eq!(err.to_string(), "'pause' is not valid while idle");
    }
}
