use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{QuestionId, Stage};

//
// ─── CHOICE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChoiceError {
    #[error("invalid choice label: {0:?} (expected one of A, B, C, D)")]
    InvalidLabel(String),
}

/// One of the four answer labels. Labels are case-sensitive: only `A`..`D` parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
}

impl Choice {
    pub const ALL: [Choice; 4] = [Choice::A, Choice::B, Choice::C, Choice::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
        }
    }

    fn index(self) -> usize {
        match self {
            Choice::A => 0,
            Choice::B => 1,
            Choice::C => 2,
            Choice::D => 3,
        }
    }
}

impl FromStr for Choice {
    type Err = ChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            other => Err(ChoiceError::InvalidLabel(other.to_string())),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("choice {0} cannot be empty")]
    EmptyChoice(Choice),
}

/// Catalog entry before it has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub choices: [String; 4],
    pub correct: Choice,
    pub stage: Stage,
    pub hint: String,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(
        prompt: impl Into<String>,
        choices: [&str; 4],
        correct: Choice,
        stage: Stage,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            choices: choices.map(str::to_string),
            correct,
            stage,
            hint: hint.into(),
        }
    }

    /// Checks that the prompt and all four choices carry text.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for the first blank field found.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        for choice in Choice::ALL {
            if self.choices[choice.index()].trim().is_empty() {
                return Err(QuestionError::EmptyChoice(choice));
            }
        }
        Ok(())
    }

    /// Validate the draft and attach its storage id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if validation fails.
    pub fn assign_id(self, id: QuestionId) -> Result<Question, QuestionError> {
        self.validate()?;
        Ok(Question {
            id,
            prompt: self.prompt,
            choices: self.choices,
            correct: self.correct,
            stage: self.stage,
            hint: self.hint,
        })
    }
}

/// Immutable multiple-choice question tagged with a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    choices: [String; 4],
    correct: Choice,
    stage: Stage,
    hint: String,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choice(&self, choice: Choice) -> &str {
        &self.choices[choice.index()]
    }

    /// Labeled choices in `A..D` order.
    pub fn choices(&self) -> impl Iterator<Item = (Choice, &str)> {
        Choice::ALL.into_iter().map(|c| (c, self.choice(c)))
    }

    #[must_use]
    pub fn correct(&self) -> Choice {
        self.correct
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn hint(&self) -> &str {
        &self.hint
    }

    #[must_use]
    pub fn is_correct(&self, selected: Choice) -> bool {
        selected == self.correct
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
