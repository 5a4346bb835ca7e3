use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Highest stage a session can reach. Passing it completes the session.
pub const STAGE_MAX: u8 = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StageError {
    #[error("stage {0} is outside 1..={max}", max = STAGE_MAX)]
    OutOfRange(i64),
}

/// Ordinal checkpoint a session progresses through, always in `1..=STAGE_MAX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stage(u8);

impl Stage {
    pub const FIRST: Stage = Stage(1);
    pub const FINAL: Stage = Stage(STAGE_MAX);

    /// Validates a raw stage number.
    ///
    /// # Errors
    ///
    /// Returns `StageError::OutOfRange` if `value` is not in `1..=STAGE_MAX`.
    pub fn new(value: u8) -> Result<Self, StageError> {
        if (1..=STAGE_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StageError::OutOfRange(i64::from(value)))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_final(self) -> bool {
        self.0 == STAGE_MAX
    }

    /// The following stage, capped at `STAGE_MAX`.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1).min(STAGE_MAX))
    }

    /// Display name of the stage.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Qualification",
            2 => "Semi-final",
            3 => "Boss",
            _ => "Golden Keyboard",
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<u8> for Stage {
    type Error = StageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Stage {
    type Error = StageError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| StageError::OutOfRange(value))
            .and_then(Self::new)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.0
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage({})", self.0)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
