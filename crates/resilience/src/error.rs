use thiserror::Error;

pub type ResilienceResult<T> = Result<T, ResilienceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResilienceError {
    /// Every attempt failed; only the last failure's message is kept
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: usize, last_error: String },

    #[error("retry policy allows no attempts")]
    NoAttempts,
}

impl ResilienceError {
    /// How many times the operation actually ran
    pub fn attempts(&self) -> usize {
        match self {
            Self::RetriesExhausted { attempts, .. } => *attempts,
            Self::NoAttempts => 0,
        }
    }
}
