//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::ScoringError;
use quiz_core::model::{PlayerError, QuestionError, QuestionId, SessionId, StageError};
use storage::repository::StorageError;

/// Errors emitted by `GameService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("session already completed")]
    Completed,
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GameError {
    pub(crate) fn session_not_found(id: SessionId) -> Self {
        Self::NotFound {
            entity: "session",
            id: id.to_string(),
        }
    }

    pub(crate) fn question_not_found(id: QuestionId) -> Self {
        Self::NotFound {
            entity: "question",
            id: id.to_string(),
        }
    }

    pub(crate) fn player_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "player",
            id: id.to_string(),
        }
    }

    /// True for the lookup failures callers should surface as "unknown entity".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, GameError::NotFound { .. })
    }
}

/// Submitting to a finished session is the only rejection the engine makes.
impl From<ScoringError> for GameError {
    fn from(_: ScoringError) -> Self {
        GameError::Completed
    }
}

/// Errors emitted while seeding or loading the question catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
