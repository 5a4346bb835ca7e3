//! Session manager: player lookup, session lifecycle, answers, perks and snapshots.

mod service;
mod snapshot;

pub use service::GameService;
pub use snapshot::{
    ChoiceView, HintOutcome, MobilePerkResult, QuestionView, ScoreEntry, SessionSnapshot,
};
