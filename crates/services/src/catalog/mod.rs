//! Question catalog loaded once from the question repository.

mod builtin;

use std::collections::BTreeMap;

use quiz_core::model::{Question, QuestionId, STAGE_MAX, Stage};
use storage::repository::QuestionRepository;
use tracing::{debug, info, warn};

use crate::error::CatalogError;

pub use builtin::builtin_questions;

/// Immutable, in-memory view of every question, grouped by stage.
///
/// Built explicitly from a repository and handed to whoever needs it; there is no
/// process-wide cache.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    by_id: BTreeMap<QuestionId, Question>,
    by_stage: BTreeMap<Stage, Vec<QuestionId>>,
}

impl QuestionCatalog {
    /// Build a catalog from an explicit question list.
    #[must_use]
    pub fn new(questions: impl IntoIterator<Item = Question>) -> Self {
        let mut by_id = BTreeMap::new();
        let mut by_stage: BTreeMap<Stage, Vec<QuestionId>> = BTreeMap::new();
        for question in questions {
            by_stage
                .entry(question.stage())
                .or_default()
                .push(question.id());
            by_id.insert(question.id(), question);
        }
        for ids in by_stage.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        Self { by_id, by_stage }
    }

    /// Load every question from the repository.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the repository fails.
    pub async fn load(repo: &dyn QuestionRepository) -> Result<Self, CatalogError> {
        let catalog = Self::new(repo.list_questions().await?);
        for raw in 1..=STAGE_MAX {
            let stage = Stage::new(raw)?;
            if catalog.for_stage(stage).next().is_none() {
                warn!(stage = raw, "no questions for stage");
            }
        }
        debug!(questions = catalog.len(), "question catalog loaded");
        Ok(catalog)
    }

    /// Insert the built-in question set when the repository is empty.
    ///
    /// The set is written as one batch, so a failed seed leaves the repository
    /// empty and the next call retries it. Returns the number of questions
    /// inserted (zero when already populated).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the built-in set is invalid or storage fails.
    pub async fn ensure_seeded(repo: &dyn QuestionRepository) -> Result<usize, CatalogError> {
        if repo.count_questions().await? > 0 {
            return Ok(0);
        }
        let drafts = builtin_questions()?;
        for draft in &drafts {
            draft.validate()?;
        }
        repo.insert_questions(&drafts).await?;
        info!(inserted = drafts.len(), "seeded built-in questions");
        Ok(drafts.len())
    }

    /// Seed if empty, then load.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if seeding or loading fails.
    pub async fn load_seeded(repo: &dyn QuestionRepository) -> Result<Self, CatalogError> {
        Self::ensure_seeded(repo).await?;
        Self::load(repo).await
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.by_id.get(&id)
    }

    /// Questions tagged with `stage`, in id order.
    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Question> {
        self.by_stage
            .get(&stage)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
