#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod game;
pub mod selector;

pub use quiz_core::Clock;

pub use catalog::QuestionCatalog;
pub use error::{CatalogError, GameError};
pub use game::{
    ChoiceView, GameService, HintOutcome, MobilePerkResult, QuestionView, ScoreEntry,
    SessionSnapshot,
};
pub use selector::{QuestionSelector, RandomSource, SeededRandom, ThreadRandom};
