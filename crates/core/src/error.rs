use thiserror::Error;

use crate::model::{ChoiceError, PlayerError, QuestionError, RoleError, StageError};
use crate::scoring::ScoringError;

/// Any domain validation or rule failure from this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Choice(#[from] ChoiceError),
    #[error(transparent)]
    Role(#[from] RoleError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
