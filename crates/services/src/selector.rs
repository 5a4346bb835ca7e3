use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use quiz_core::model::{Question, QuestionId, Stage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::catalog::QuestionCatalog;

/// Source of uniform indices for question selection.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. Callers never pass `len == 0`.
    fn pick(&self, len: usize) -> usize;
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Deterministic generator for reproducible runs and tests.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandom").finish_non_exhaustive()
    }
}

impl RandomSource for SeededRandom {
    fn pick(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(0..len)
    }
}

/// Chooses the question to present for a stage.
///
/// Candidates narrow in order: stage, then unseen, then not excluded. A filter
/// is only applied when it leaves at least one candidate, and the pick is
/// uniform over the last non-empty pool.
#[derive(Clone)]
pub struct QuestionSelector {
    random: Arc<dyn RandomSource>,
}

impl Default for QuestionSelector {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}

impl fmt::Debug for QuestionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestionSelector").finish_non_exhaustive()
    }
}

impl QuestionSelector {
    #[must_use]
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(Arc::new(SeededRandom::new(seed)))
    }

    /// Pick a question of `stage`, preferring ones not in `seen` and not `exclude`.
    ///
    /// Returns `None` only when the stage has no questions at all.
    pub fn select<'c>(
        &self,
        catalog: &'c QuestionCatalog,
        stage: Stage,
        seen: &HashSet<QuestionId>,
        exclude: Option<QuestionId>,
    ) -> Option<&'c Question> {
        let mut pool: Vec<&Question> = catalog.for_stage(stage).collect();
        if pool.is_empty() {
            return None;
        }

        narrow(&mut pool, |q| !seen.contains(&q.id()));
        if let Some(excluded) = exclude {
            narrow(&mut pool, |q| q.id() != excluded);
        }

        let picked = pool[self.random.pick(pool.len())];
        debug!(
            stage = stage.value(),
            candidates = pool.len(),
            question_id = picked.id().value(),
            "selected question"
        );
        Some(picked)
    }
}

fn narrow(pool: &mut Vec<&Question>, keep: impl Fn(&Question) -> bool) {
    if pool.iter().any(|q| keep(q)) {
        pool.retain(|q| keep(q));
    }
}
