use std::collections::HashSet;
use std::sync::Arc;

use quiz_core::model::{
    AnswerLog, AnswerStats, Choice, GameSession, Player, Question, QuestionId, Role, SessionId,
    normalize_player_name,
};
use quiz_core::ScoringEngine;
use storage::repository::{
    AnswerLogRepository, AnswerPersistence, GameStartPersistence, NewPlayerRecord,
    PlayerRepository, SessionRepository, Storage,
};
use tracing::{debug, info};

use super::snapshot::{HintOutcome, MobilePerkResult, ScoreEntry, SessionSnapshot};
use crate::Clock;
use crate::catalog::QuestionCatalog;
use crate::error::GameError;
use crate::selector::{QuestionSelector, RandomSource};

/// Orchestrates players, sessions, answers and perks on top of the repositories.
///
/// Every command is a single read-modify-persist cycle against one session and
/// returns a fresh [`SessionSnapshot`].
#[derive(Clone)]
pub struct GameService {
    clock: Clock,
    engine: ScoringEngine,
    selector: QuestionSelector,
    catalog: Arc<QuestionCatalog>,
    players: Arc<dyn PlayerRepository>,
    sessions: Arc<dyn SessionRepository>,
    answers: Arc<dyn AnswerLogRepository>,
    answer_writes: Arc<dyn AnswerPersistence>,
    game_starts: Arc<dyn GameStartPersistence>,
}

impl GameService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<QuestionCatalog>,
        players: Arc<dyn PlayerRepository>,
        sessions: Arc<dyn SessionRepository>,
        answers: Arc<dyn AnswerLogRepository>,
        answer_writes: Arc<dyn AnswerPersistence>,
        game_starts: Arc<dyn GameStartPersistence>,
    ) -> Self {
        Self {
            clock,
            engine: ScoringEngine::new(),
            selector: QuestionSelector::default(),
            catalog,
            players,
            sessions,
            answers,
            answer_writes,
            game_starts,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, catalog: Arc<QuestionCatalog>, storage: &Storage) -> Self {
        Self::new(
            clock,
            catalog,
            Arc::clone(&storage.players),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.answer_writes),
            Arc::clone(&storage.game_starts),
        )
    }

    /// Replace the random source used for question selection.
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.selector = QuestionSelector::new(random);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    //
    // ─── SESSION LIFECYCLE ─────────────────────────────────────────────────────
    //

    /// Find or create the player, overwrite their role, and open a fresh session,
    /// all in one storage write.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Player` for an invalid name, or `GameError::Storage`.
    pub async fn start_new_game(
        &self,
        name: &str,
        role: Role,
    ) -> Result<SessionSnapshot, GameError> {
        let name = normalize_player_name(name)?;
        let now = self.clock.now();

        let (player, session) = self
            .game_starts
            .start_game(
                NewPlayerRecord {
                    name,
                    role,
                    created_at: now,
                },
                now,
            )
            .await?;
        info!(
            session_id = session.id().value(),
            player = player.name(),
            role = role.as_str(),
            "started new game"
        );

        self.snapshot_for(&player, &session, None).await
    }

    /// Snapshot of the player's most recently started session, if any.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Storage` on backend failures.
    pub async fn resume_last_game(&self, name: &str) -> Result<Option<SessionSnapshot>, GameError> {
        let Some(player) = self.find_player(name).await? else {
            return Ok(None);
        };
        let Some(session) = self.sessions.latest_session_for_player(player.id()).await? else {
            return Ok(None);
        };
        debug!(session_id = session.id().value(), "resuming game");
        self.snapshot_for(&player, &session, None).await.map(Some)
    }

    /// # Errors
    ///
    /// Returns `GameError::NotFound` if the session or its player is unknown.
    pub async fn build_snapshot(&self, session_id: SessionId) -> Result<SessionSnapshot, GameError> {
        let session = self.load_session(session_id).await?;
        let player = self.load_player(&session).await?;
        self.snapshot_for(&player, &session, None).await
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Grade an answer and persist the session together with its answer log.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NotFound` for an unknown session or question and
    /// `GameError::Completed` when the session is already finished; nothing is
    /// persisted in either case.
    pub async fn submit_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        selected: Choice,
    ) -> Result<SessionSnapshot, GameError> {
        let mut session = self.load_session(session_id).await?;
        let question = self
            .catalog
            .get(question_id)
            .ok_or_else(|| GameError::question_not_found(question_id))?;
        let player = self.load_player(&session).await?;

        let log = self
            .engine
            .submit_answer(&mut session, question, selected, self.clock.now())?;
        self.answer_writes.apply_answer(&session, &log).await?;

        debug!(
            session_id = session_id.value(),
            question_id = question_id.value(),
            correct = log.is_correct,
            score = session.score(),
            "answer recorded"
        );
        if session.is_completed() {
            info!(
                session_id = session_id.value(),
                score = session.score(),
                "session completed"
            );
        }

        self.snapshot_for(&player, &session, None).await
    }

    //
    // ─── PERKS ─────────────────────────────────────────────────────────────────
    //

    /// Skip perk. `shown` is the question currently displayed; the next
    /// question avoids it when the stage offers an alternative.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NotFound` if the session is unknown.
    pub async fn use_front_perk(
        &self,
        session_id: SessionId,
        shown: Option<QuestionId>,
    ) -> Result<SessionSnapshot, GameError> {
        let mut session = self.load_session(session_id).await?;
        let player = self.load_player(&session).await?;

        let outcome = self.engine.use_front_perk(&mut session);
        let exclude = if outcome.is_applied() {
            self.sessions.update_session(&session).await?;
            info!(
                session_id = session_id.value(),
                stage = session.stage().value(),
                "front perk applied"
            );
            shown
        } else {
            debug!(session_id = session_id.value(), "front perk already used");
            None
        };

        self.snapshot_for(&player, &session, exclude).await
    }

    /// Catch-up perk, based on the most recent answer of the session.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NotFound` if the session is unknown.
    pub async fn use_back_perk(&self, session_id: SessionId) -> Result<SessionSnapshot, GameError> {
        let mut session = self.load_session(session_id).await?;
        let player = self.load_player(&session).await?;
        let last = self.answers.latest_answer(session_id).await?;

        if self
            .engine
            .use_back_perk(&mut session, last.as_ref())
            .is_applied()
        {
            self.sessions.update_session(&session).await?;
            info!(
                session_id = session_id.value(),
                score = session.score(),
                streak = session.streak(),
                "back perk applied"
            );
        } else {
            debug!(session_id = session_id.value(), "back perk already used");
        }

        self.snapshot_for(&player, &session, None).await
    }

    /// Hint perk. The hint comes from `shown` when it is a question of the
    /// session's stage, otherwise from the selector's pick.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NotFound` if the session is unknown.
    pub async fn use_mobile_perk(
        &self,
        session_id: SessionId,
        shown: Option<QuestionId>,
    ) -> Result<MobilePerkResult, GameError> {
        let mut session = self.load_session(session_id).await?;
        let player = self.load_player(&session).await?;

        if !self.engine.use_mobile_perk(&mut session).is_applied() {
            debug!(session_id = session_id.value(), "mobile perk already used");
            return Ok(MobilePerkResult {
                hint: HintOutcome::AlreadyUsed,
                snapshot: self.snapshot_for(&player, &session, None).await?,
            });
        }
        self.sessions.update_session(&session).await?;

        let logs = self.answers.answers_for_session(session_id).await?;
        let current = if session.is_completed() {
            None
        } else {
            shown
                .and_then(|id| self.catalog.get(id))
                .filter(|q| q.stage() == session.stage())
                .or_else(|| self.select_for(&session, &logs, None))
        };
        let hint = match current.map(Question::hint) {
            Some(text) if !text.trim().is_empty() => HintOutcome::Hint(text.to_string()),
            _ => HintOutcome::Unavailable,
        };
        info!(
            session_id = session_id.value(),
            revealed = matches!(hint, HintOutcome::Hint(_)),
            "mobile perk applied"
        );

        let snapshot =
            SessionSnapshot::assemble(&player, &session, AnswerStats::from_logs(&logs), current);
        Ok(MobilePerkResult { hint, snapshot })
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    /// Every session across all players, highest score first.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Storage` on backend failures.
    pub async fn list_scores(&self) -> Result<Vec<ScoreEntry>, GameError> {
        let records = self.sessions.list_scores().await?;
        Ok(records.into_iter().map(ScoreEntry::from).collect())
    }

    /// Sessions of a named player, most recently started first. Unknown
    /// players have no history.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Storage` on backend failures.
    pub async fn list_history(&self, name: &str) -> Result<Vec<GameSession>, GameError> {
        match self.find_player(name).await? {
            Some(player) => Ok(self.sessions.sessions_for_player(player.id()).await?),
            None => Ok(Vec::new()),
        }
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    async fn find_player(&self, name: &str) -> Result<Option<Player>, GameError> {
        let Ok(name) = normalize_player_name(name) else {
            return Ok(None);
        };
        Ok(self.players.find_player_by_name(&name).await?)
    }

    async fn load_session(&self, id: SessionId) -> Result<GameSession, GameError> {
        self.sessions
            .get_session(id)
            .await?
            .ok_or_else(|| GameError::session_not_found(id))
    }

    async fn load_player(&self, session: &GameSession) -> Result<Player, GameError> {
        let id = session.player_id();
        self.players
            .get_player(id)
            .await?
            .ok_or_else(|| GameError::player_not_found(id))
    }

    fn select_for(
        &self,
        session: &GameSession,
        logs: &[AnswerLog],
        exclude: Option<QuestionId>,
    ) -> Option<&Question> {
        let seen: HashSet<QuestionId> = logs.iter().map(|log| log.question_id).collect();
        self.selector
            .select(&self.catalog, session.stage(), &seen, exclude)
    }

    async fn snapshot_for(
        &self,
        player: &Player,
        session: &GameSession,
        exclude: Option<QuestionId>,
    ) -> Result<SessionSnapshot, GameError> {
        let logs = self.answers.answers_for_session(session.id()).await?;
        let current = if session.is_completed() {
            None
        } else {
            self.select_for(session, &logs, exclude)
        };
        Ok(SessionSnapshot::assemble(
            player,
            session,
            AnswerStats::from_logs(&logs),
            current,
        ))
    }
}
