use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{PlayerId, SessionId, Stage};

/// One-shot perk flags. Each flips false→true at most once per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerkFlags {
    pub front: bool,
    pub back: bool,
    pub mobile: bool,
}

impl PerkFlags {
    #[must_use]
    pub fn any(self) -> bool {
        self.front || self.back || self.mobile
    }
}

/// Progress of one game, owned by exactly one player.
///
/// Fields are read-only from the outside; [`crate::ScoringEngine`] is the only
/// writer, which keeps stage monotonic and `completed` set at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSession {
    id: SessionId,
    player_id: PlayerId,
    started_at: DateTime<Utc>,
    stage: Stage,
    score: u32,
    streak: u32,
    completed: bool,
    perks: PerkFlags,
}

impl GameSession {
    /// A fresh session at stage 1 with no score, streak or perks.
    #[must_use]
    pub fn new(id: SessionId, player_id: PlayerId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            player_id,
            started_at,
            stage: Stage::FIRST,
            score: 0,
            streak: 0,
            completed: false,
            perks: PerkFlags::default(),
        }
    }

    /// Rehydrate a session from persisted storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: SessionId,
        player_id: PlayerId,
        started_at: DateTime<Utc>,
        stage: Stage,
        score: u32,
        streak: u32,
        completed: bool,
        perks: PerkFlags,
    ) -> Self {
        Self {
            id,
            player_id,
            started_at,
            stage,
            score,
            streak,
            completed,
            perks,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn perks(&self) -> PerkFlags {
        self.perks
    }

    /// True once any of the three perks has been spent.
    #[must_use]
    pub fn perk_used(&self) -> bool {
        self.perks.any()
    }

    pub(crate) fn set_streak(&mut self, streak: u32) {
        self.streak = streak;
    }

    pub(crate) fn add_score(&mut self, gain: u32) {
        self.score = self.score.saturating_add(gain);
    }

    pub(crate) fn advance_stage(&mut self) {
        self.stage = self.stage.next();
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }

    pub(crate) fn perks_mut(&mut self) -> &mut PerkFlags {
        &mut self.perks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn new_session_starts_clean() {
        let session = GameSession::new(SessionId::new(1), PlayerId::new(2), fixed_now());
        assert_eq!(session.stage(), Stage::FIRST);
        assert_eq!(session.score(), 0);
        assert_eq!(session.streak(), 0);
        assert!(!session.is_completed());
        assert!(!session.perk_used());
    }

    #[test]
    fn perk_used_is_or_of_flags() {
        let perks = PerkFlags {
            front: false,
            back: false,
            mobile: true,
        };
        let session = GameSession::from_persisted(
            SessionId::new(1),
            PlayerId::new(2),
            fixed_now(),
            Stage::FINAL,
            40,
            2,
            false,
            perks,
        );
        assert!(session.perk_used());
        assert_eq!(session.stage(), Stage::FINAL);
    }
}
