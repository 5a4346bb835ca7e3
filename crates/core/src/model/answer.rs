use chrono::{DateTime, Utc};

use crate::model::{Choice, QuestionId, SessionId};

/// Append-only record of one answer submission.
///
/// The history of these per session is the "seen set" for question selection and
/// the source of "last answer" for the back-end perk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLog {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected: Choice,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl AnswerLog {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        question_id: QuestionId,
        selected: Choice,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            question_id,
            selected,
            is_correct,
            answered_at,
        }
    }
}

/// Counts derived from a session's answer history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnswerStats {
    pub total: u32,
    pub correct: u32,
}

impl AnswerStats {
    #[must_use]
    pub fn from_logs(logs: &[AnswerLog]) -> Self {
        let total = u32::try_from(logs.len()).unwrap_or(u32::MAX);
        let correct = logs.iter().filter(|log| log.is_correct).count();
        Self {
            total,
            correct: u32::try_from(correct).unwrap_or(u32::MAX),
        }
    }

    /// Percentage of correct answers, `0.0` when nothing was answered.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.total) * 100.0
    }
}
