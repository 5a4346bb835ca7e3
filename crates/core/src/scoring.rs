use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AnswerLog, Choice, GameSession, Question};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    /// The session already passed the final stage; it accepts no more answers.
    #[error("session is already completed")]
    SessionCompleted,
}

//
// ─── PERK OUTCOME ──────────────────────────────────────────────────────────────
//

/// Whether a perk call changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerkOutcome {
    /// The flag was false and has now been set.
    Applied,
    /// The flag was already set; nothing changed.
    AlreadyUsed,
}

impl PerkOutcome {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, PerkOutcome::Applied)
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Score, streak, stage and perk rules for a game session.
///
/// The engine is pure: it mutates the session in place and hands back the
/// answer log to persist, but never touches storage itself.
///
/// # Examples
///
/// ```
/// # use quiz_core::ScoringEngine;
/// # use quiz_core::model::{Choice, GameSession, PlayerId, QuestionDraft, QuestionId, SessionId, Stage};
/// # use quiz_core::time::fixed_now;
/// let engine = ScoringEngine::new();
/// let mut session = GameSession::new(SessionId::new(1), PlayerId::new(1), fixed_now());
/// let question = QuestionDraft::new("1 + 1?", ["1", "2", "3", "4"], Choice::B, Stage::FIRST, "")
///     .assign_id(QuestionId::new(1))?;
///
/// let log = engine.submit_answer(&mut session, &question, Choice::B, fixed_now())?;
/// assert!(log.is_correct);
/// assert_eq!(session.score(), 10);
/// assert_eq!(session.stage().value(), 2);
/// # Ok::<(), quiz_core::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringEngine {
    base_gain: u32,
    streak_gain: u32,
    streak_threshold: u32,
    catch_up_bonus: u32,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringEngine {
    pub const BASE_GAIN: u32 = 10;
    pub const STREAK_GAIN: u32 = 15;
    pub const STREAK_THRESHOLD: u32 = 3;
    pub const CATCH_UP_BONUS: u32 = 5;

    #[must_use]
    pub fn new() -> Self {
        Self {
            base_gain: Self::BASE_GAIN,
            streak_gain: Self::STREAK_GAIN,
            streak_threshold: Self::STREAK_THRESHOLD,
            catch_up_bonus: Self::CATCH_UP_BONUS,
        }
    }

    /// Points awarded for a correct answer that brings the streak to `streak`.
    #[must_use]
    pub fn gain_for_streak(&self, streak: u32) -> u32 {
        if streak >= self.streak_threshold {
            self.streak_gain
        } else {
            self.base_gain
        }
    }

    /// Grade `selected` against `question` and update the session.
    ///
    /// Correct: streak +1, score + gain, then advance the stage or complete the
    /// session when already on the final stage. Incorrect: streak back to 0.
    /// Either way the returned log must be appended by the caller.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::SessionCompleted` if the session is finished; the
    /// session is left untouched.
    pub fn submit_answer(
        &self,
        session: &mut GameSession,
        question: &Question,
        selected: Choice,
        answered_at: DateTime<Utc>,
    ) -> Result<AnswerLog, ScoringError> {
        if session.is_completed() {
            return Err(ScoringError::SessionCompleted);
        }

        let is_correct = question.is_correct(selected);
        if is_correct {
            let streak = session.streak().saturating_add(1);
            session.set_streak(streak);
            session.add_score(self.gain_for_streak(streak));
            if session.stage().is_final() {
                session.mark_completed();
            } else {
                session.advance_stage();
            }
        } else {
            session.set_streak(0);
        }

        Ok(AnswerLog::new(
            session.id(),
            question.id(),
            selected,
            is_correct,
            answered_at,
        ))
    }

    /// Skip: advance one stage (capped at the final stage) without scoring.
    pub fn use_front_perk(&self, session: &mut GameSession) -> PerkOutcome {
        if session.perks().front {
            return PerkOutcome::AlreadyUsed;
        }
        session.perks_mut().front = true;
        session.advance_stage();
        PerkOutcome::Applied
    }

    /// Catch-up: if the latest answer was wrong, grant the bonus and restore a
    /// streak of 1. The flag is spent either way.
    pub fn use_back_perk(
        &self,
        session: &mut GameSession,
        last_answer: Option<&AnswerLog>,
    ) -> PerkOutcome {
        if session.perks().back {
            return PerkOutcome::AlreadyUsed;
        }
        session.perks_mut().back = true;
        if last_answer.is_some_and(|log| !log.is_correct) {
            session.add_score(self.catch_up_bonus);
            session.set_streak(1);
        }
        PerkOutcome::Applied
    }

    /// Hint: only spends the flag; revealing the hint is up to the caller.
    pub fn use_mobile_perk(&self, session: &mut GameSession) -> PerkOutcome {
        if session.perks().mobile {
            return PerkOutcome::AlreadyUsed;
        }
        session.perks_mut().mobile = true;
        PerkOutcome::Applied
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayerId, QuestionDraft, QuestionId, SessionId, Stage};
    use crate::time::fixed_now;

    fn session() -> GameSession {
        GameSession::new(SessionId::new(1), PlayerId::new(1), fixed_now())
    }

    fn question(id: u64) -> Question {
        QuestionDraft::new(
            format!("Q{id}"),
            ["a", "b", "c", "d"],
            Choice::C,
            Stage::FIRST,
            "think",
        )
        .assign_id(QuestionId::new(id))
        .unwrap()
    }

    fn answer(engine: &ScoringEngine, session: &mut GameSession, choice: Choice) -> AnswerLog {
        engine
            .submit_answer(session, &question(1), choice, fixed_now())
            .unwrap()
    }

    #[test]
    fn four_correct_answers_complete_the_game() {
        let engine = ScoringEngine::new();
        let mut s = session();

        answer(&engine, &mut s, Choice::C);
        assert_eq!((s.stage().value(), s.score(), s.streak()), (2, 10, 1));

        answer(&engine, &mut s, Choice::C);
        assert_eq!((s.stage().value(), s.score(), s.streak()), (3, 20, 2));

        answer(&engine, &mut s, Choice::C);
        assert_eq!((s.stage().value(), s.score(), s.streak()), (4, 35, 3));
        assert!(!s.is_completed());

        answer(&engine, &mut s, Choice::C);
        assert_eq!((s.stage().value(), s.score(), s.streak()), (4, 50, 4));
        assert!(s.is_completed());
    }

    #[test]
    fn wrong_answer_resets_streak_only() {
        let engine = ScoringEngine::new();
        let mut s = session();
        answer(&engine, &mut s, Choice::C);

        let log = answer(&engine, &mut s, Choice::A);

        assert!(!log.is_correct);
        assert_eq!(log.selected, Choice::A);
        assert_eq!(s.streak(), 0);
        assert_eq!(s.stage().value(), 2);
        assert_eq!(s.score(), 10);
    }

    #[test]
    fn streak_bonus_restarts_after_a_miss() {
        let engine = ScoringEngine::new();
        let mut s = session();
        answer(&engine, &mut s, Choice::C);
        answer(&engine, &mut s, Choice::C);
        answer(&engine, &mut s, Choice::B);
        answer(&engine, &mut s, Choice::C);
        assert_eq!(s.streak(), 1);
        assert_eq!(s.score(), 30);
    }

    #[test]
    fn gains_are_only_ten_or_fifteen() {
        let engine = ScoringEngine::new();
        for streak in 1..10 {
            let gain = engine.gain_for_streak(streak);
            assert_eq!(gain, if streak >= 3 { 15 } else { 10 });
        }
    }

    #[test]
    fn completed_session_rejects_answers() {
        let engine = ScoringEngine::new();
        let mut s = session();
        for _ in 0..4 {
            answer(&engine, &mut s, Choice::C);
        }
        let before = s.clone();

        let err = engine
            .submit_answer(&mut s, &question(2), Choice::C, fixed_now())
            .unwrap_err();

        assert_eq!(err, ScoringError::SessionCompleted);
        assert_eq!(s, before);
    }

    #[test]
    fn front_perk_skips_a_stage_once() {
        let engine = ScoringEngine::new();
        let mut s = session();

        assert_eq!(engine.use_front_perk(&mut s), PerkOutcome::Applied);
        assert_eq!(s.stage().value(), 2);
        assert_eq!((s.score(), s.streak()), (0, 0));
        assert!(s.perks().front);

        assert_eq!(engine.use_front_perk(&mut s), PerkOutcome::AlreadyUsed);
        assert_eq!(s.stage().value(), 2);
    }

    #[test]
    fn front_perk_is_capped_at_final_stage() {
        let engine = ScoringEngine::new();
        let mut s = session();
        for _ in 0..3 {
            answer(&engine, &mut s, Choice::C);
        }
        engine.use_front_perk(&mut s);
        assert_eq!(s.stage(), Stage::FINAL);
        assert!(!s.is_completed());
    }

    #[test]
    fn back_perk_softens_a_miss() {
        let engine = ScoringEngine::new();
        let mut s = session();
        let last = answer(&engine, &mut s, Choice::A);

        assert!(engine.use_back_perk(&mut s, Some(&last)).is_applied());
        assert_eq!((s.score(), s.streak()), (5, 1));
        assert!(s.perks().back);

        assert_eq!(
            engine.use_back_perk(&mut s, Some(&last)),
            PerkOutcome::AlreadyUsed
        );
        assert_eq!((s.score(), s.streak()), (5, 1));
    }

    #[test]
    fn back_perk_without_a_miss_only_sets_flag() {
        let engine = ScoringEngine::new();
        let mut s = session();
        assert!(engine.use_back_perk(&mut s, None).is_applied());
        assert_eq!((s.score(), s.streak()), (0, 0));

        let mut s = session();
        let last = answer(&engine, &mut s, Choice::C);
        engine.use_back_perk(&mut s, Some(&last));
        assert_eq!((s.score(), s.streak()), (10, 1));
        assert!(s.perks().back);
    }

    #[test]
    fn mobile_perk_only_flips_its_flag() {
        let engine = ScoringEngine::new();
        let mut s = session();
        assert!(engine.use_mobile_perk(&mut s).is_applied());
        assert!(!engine.use_mobile_perk(&mut s).is_applied());
        let perks = s.perks();
        assert!(perks.mobile && !perks.front && !perks.back);
        assert_eq!(s.stage(), Stage::FIRST);
    }
}
