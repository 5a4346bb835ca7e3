#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scoring;
pub mod time;

pub use error::Error;
pub use scoring::{PerkOutcome, ScoringEngine, ScoringError};
pub use time::Clock;
