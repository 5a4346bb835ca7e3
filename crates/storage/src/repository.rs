use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerLog, GameSession, Player, PlayerId, Question, QuestionDraft, QuestionId, Role,
    SessionId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a player; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayerRecord {
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a session; the backend assigns the id and the session starts
/// at stage 1 with no score, streak or perks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSessionRecord {
    pub player_id: PlayerId,
    pub started_at: DateTime<Utc>,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub session_id: SessionId,
    pub player_name: String,
    pub score: u32,
    pub started_at: DateTime<Utc>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Look up a player by exact (already normalized) name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError>;

    /// Insert a new player.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is taken.
    async fn insert_player(&self, player: NewPlayerRecord) -> Result<Player, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the player does not exist.
    async fn update_player_role(&self, id: PlayerId, role: Role) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn insert_session(&self, session: NewSessionRecord)
    -> Result<GameSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<GameSession>, StorageError>;

    /// Overwrite the mutable fields of an existing session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn update_session(&self, session: &GameSession) -> Result<(), StorageError>;

    /// Most recently started session of a player (ties broken by highest id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_session_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<GameSession>, StorageError>;

    /// All sessions of a player, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn sessions_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<GameSession>, StorageError>;

    /// Every session with its player name, highest score first, ties in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_questions(&self) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, draft: &QuestionDraft) -> Result<QuestionId, StorageError>;

    /// Insert a batch of questions, all or nothing. Ids are returned in input order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any draft cannot be stored; none are kept then.
    async fn insert_questions(
        &self,
        drafts: &[QuestionDraft],
    ) -> Result<Vec<QuestionId>, StorageError>;

    /// Full catalog in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;
}

#[async_trait]
pub trait AnswerLogRepository: Send + Sync {
    /// Append a log row and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be stored.
    async fn append_answer(&self, log: &AnswerLog) -> Result<i64, StorageError>;

    /// History of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn answers_for_session(&self, session_id: SessionId)
    -> Result<Vec<AnswerLog>, StorageError>;

    /// Latest answer of a session by timestamp (ties broken by highest row id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_answer(&self, session_id: SessionId)
    -> Result<Option<AnswerLog>, StorageError>;
}

/// Atomic write of an answered session: updated session and its new log row.
#[async_trait]
pub trait AnswerPersistence: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the log belongs to another session,
    /// `StorageError::NotFound` if the session is missing, or other storage errors.
    async fn apply_answer(&self, session: &GameSession, log: &AnswerLog)
    -> Result<i64, StorageError>;
}

/// Atomic start of a game: find or create the player by name, overwrite the
/// role, and open a fresh session.
#[async_trait]
pub trait GameStartPersistence: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if any step fails; nothing is kept then.
    async fn start_game(
        &self,
        player: NewPlayerRecord,
        started_at: DateTime<Utc>,
    ) -> Result<(Player, GameSession), StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    players: BTreeMap<PlayerId, Player>,
    sessions: BTreeMap<SessionId, GameSession>,
    questions: BTreeMap<QuestionId, Question>,
    answers: Vec<(i64, AnswerLog)>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn append_answer(&mut self, log: &AnswerLog) -> i64 {
        let id = i64::try_from(self.answers.len()).unwrap_or(i64::MAX - 1) + 1;
        self.answers.push((id, log.clone()));
        id
    }

    fn sessions_newest_first(&self, player_id: PlayerId) -> Vec<GameSession> {
        let mut sessions: Vec<GameSession> = self
            .sessions
            .values()
            .filter(|s| s.player_id() == player_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (b.started_at(), b.id()).cmp(&(a.started_at(), a.id())));
        sessions
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl PlayerRepository for InMemoryRepository {
    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.players.values().find(|p| p.name() == name).cloned())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.players.get(&id).cloned())
    }

    async fn insert_player(&self, player: NewPlayerRecord) -> Result<Player, StorageError> {
        let mut guard = self.lock()?;
        if guard.players.values().any(|p| p.name() == player.name) {
            return Err(StorageError::Conflict);
        }
        let id = PlayerId::new(guard.next_id());
        let player = Player::new(id, &player.name, player.role, player.created_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.players.insert(id, player.clone());
        Ok(player)
    }

    async fn update_player_role(&self, id: PlayerId, role: Role) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let player = guard.players.get_mut(&id).ok_or(StorageError::NotFound)?;
        player.set_role(role);
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(
        &self,
        session: NewSessionRecord,
    ) -> Result<GameSession, StorageError> {
        let mut guard = self.lock()?;
        if !guard.players.contains_key(&session.player_id) {
            return Err(StorageError::NotFound);
        }
        let id = SessionId::new(guard.next_id());
        let created = GameSession::new(id, session.player_id, session.started_at);
        guard.sessions.insert(id, created.clone());
        Ok(created)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<GameSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(&id).cloned())
    }

    async fn update_session(&self, session: &GameSession) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .sessions
            .get_mut(&session.id())
            .ok_or(StorageError::NotFound)?;
        *slot = session.clone();
        Ok(())
    }

    async fn latest_session_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<GameSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.sessions_newest_first(player_id).into_iter().next())
    }

    async fn sessions_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<GameSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.sessions_newest_first(player_id))
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        let guard = self.lock()?;
        let mut scores = Vec::with_capacity(guard.sessions.len());
        for session in guard.sessions.values() {
            let player = guard
                .players
                .get(&session.player_id())
                .ok_or(StorageError::NotFound)?;
            scores.push(ScoreRecord {
                session_id: session.id(),
                player_name: player.name().to_string(),
                score: session.score(),
                started_at: session.started_at(),
            });
        }
        // Sessions iterate in id order; the stable sort keeps it for equal scores.
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(scores)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn count_questions(&self) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.len() as u64)
    }

    async fn insert_question(&self, draft: &QuestionDraft) -> Result<QuestionId, StorageError> {
        let mut guard = self.lock()?;
        let id = QuestionId::new(guard.next_id());
        let question = draft
            .clone()
            .assign_id(id)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.questions.insert(id, question);
        Ok(id)
    }

    async fn insert_questions(
        &self,
        drafts: &[QuestionDraft],
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut guard = self.lock()?;
        let questions = drafts
            .iter()
            .map(|draft| {
                let id = QuestionId::new(guard.next_id());
                draft
                    .clone()
                    .assign_id(id)
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ids = questions.iter().map(Question::id).collect();
        for question in questions {
            guard.questions.insert(question.id(), question);
        }
        Ok(ids)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.values().cloned().collect())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.get(&id).cloned())
    }
}

#[async_trait]
impl AnswerLogRepository for InMemoryRepository {
    async fn append_answer(&self, log: &AnswerLog) -> Result<i64, StorageError> {
        let mut guard = self.lock()?;
        if !guard.sessions.contains_key(&log.session_id) {
            return Err(StorageError::NotFound);
        }
        Ok(guard.append_answer(log))
    }

    async fn answers_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerLog>, StorageError> {
        let guard = self.lock()?;
        let mut logs: Vec<&(i64, AnswerLog)> = guard
            .answers
            .iter()
            .filter(|(_, log)| log.session_id == session_id)
            .collect();
        logs.sort_by_key(|(id, log)| (log.answered_at, *id));
        Ok(logs.into_iter().map(|(_, log)| log.clone()).collect())
    }

    async fn latest_answer(
        &self,
        session_id: SessionId,
    ) -> Result<Option<AnswerLog>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .answers
            .iter()
            .filter(|(_, log)| log.session_id == session_id)
            .max_by_key(|(id, log)| (log.answered_at, *id))
            .map(|(_, log)| log.clone()))
    }
}

#[async_trait]
impl AnswerPersistence for InMemoryRepository {
    async fn apply_answer(
        &self,
        session: &GameSession,
        log: &AnswerLog,
    ) -> Result<i64, StorageError> {
        if log.session_id != session.id() {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.lock()?;
        let slot = guard
            .sessions
            .get_mut(&session.id())
            .ok_or(StorageError::NotFound)?;
        *slot = session.clone();
        Ok(guard.append_answer(log))
    }
}

#[async_trait]
impl GameStartPersistence for InMemoryRepository {
    async fn start_game(
        &self,
        player: NewPlayerRecord,
        started_at: DateTime<Utc>,
    ) -> Result<(Player, GameSession), StorageError> {
        let mut guard = self.lock()?;
        let existing = guard
            .players
            .values()
            .find(|p| p.name() == player.name)
            .map(Player::id);
        let player = match existing {
            Some(id) => {
                let stored = guard.players.get_mut(&id).ok_or(StorageError::NotFound)?;
                stored.set_role(player.role);
                stored.clone()
            }
            None => {
                let id = PlayerId::new(guard.next_id());
                let created = Player::new(id, &player.name, player.role, player.created_at)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                guard.players.insert(id, created.clone());
                created
            }
        };
        let id = SessionId::new(guard.next_id());
        let session = GameSession::new(id, player.id(), started_at);
        guard.sessions.insert(id, session.clone());
        Ok((player, session))
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub players: Arc<dyn PlayerRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub answers: Arc<dyn AnswerLogRepository>,
    pub answer_writes: Arc<dyn AnswerPersistence>,
    pub game_starts: Arc<dyn GameStartPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            players: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            answers: Arc::new(repo.clone()),
            answer_writes: Arc::new(repo.clone()),
            game_starts: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Choice, Stage};
    use quiz_core::time::fixed_now;

    async fn player(repo: &InMemoryRepository, name: &str) -> Player {
        repo.insert_player(NewPlayerRecord {
            name: name.into(),
            role: Role::Front,
            created_at: fixed_now(),
        })
        .await
        .unwrap()
    }

    async fn session_at(repo: &InMemoryRepository, player_id: PlayerId, offset: i64) -> GameSession {
        repo.insert_session(NewSessionRecord {
            player_id,
            started_at: fixed_now() + Duration::minutes(offset),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_player_name_conflicts() {
        let repo = InMemoryRepository::new();
        player(&repo, "Ada").await;
        let err = repo
            .insert_player(NewPlayerRecord {
                name: "Ada".into(),
                role: Role::Back,
                created_at: fixed_now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn latest_session_uses_start_time_then_id() {
        let repo = InMemoryRepository::new();
        let ada = player(&repo, "Ada").await;
        let late = session_at(&repo, ada.id(), 10).await;
        let _early = session_at(&repo, ada.id(), 0).await;
        let tie = session_at(&repo, ada.id(), 10).await;

        let latest = repo.latest_session_for_player(ada.id()).await.unwrap();
        assert_eq!(latest.map(|s| s.id()), Some(tie.id()));

        let history = repo.sessions_for_player(ada.id()).await.unwrap();
        let ids: Vec<_> = history.iter().map(GameSession::id).collect();
        assert_eq!(ids[0], tie.id());
        assert_eq!(ids[1], late.id());
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn apply_answer_rejects_foreign_log() {
        let repo = InMemoryRepository::new();
        let ada = player(&repo, "Ada").await;
        let s1 = session_at(&repo, ada.id(), 0).await;
        let s2 = session_at(&repo, ada.id(), 1).await;
        let log = AnswerLog::new(s2.id(), QuestionId::new(9), Choice::A, true, fixed_now());

        let err = repo.apply_answer(&s1, &log).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert!(repo.answers_for_session(s2.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_answer_breaks_timestamp_ties_by_insertion() {
        let repo = InMemoryRepository::new();
        let ada = player(&repo, "Ada").await;
        let s = session_at(&repo, ada.id(), 0).await;
        let first = AnswerLog::new(s.id(), QuestionId::new(1), Choice::A, true, fixed_now());
        let second = AnswerLog::new(s.id(), QuestionId::new(2), Choice::B, false, fixed_now());
        repo.append_answer(&first).await.unwrap();
        repo.append_answer(&second).await.unwrap();

        let latest = repo.latest_answer(s.id()).await.unwrap().unwrap();
        assert_eq!(latest, second);
        assert_eq!(repo.answers_for_session(s.id()).await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn questions_round_trip() {
        let repo = InMemoryRepository::new();
        let draft = QuestionDraft::new("Q", ["a", "b", "c", "d"], Choice::D, Stage::FINAL, "h");
        let id = repo.insert_question(&draft).await.unwrap();
        assert_eq!(repo.count_questions().await.unwrap(), 1);
        let fetched = repo.get_question(id).await.unwrap().unwrap();
        assert_eq!(fetched.correct(), Choice::D);
        assert_eq!(fetched.stage(), Stage::FINAL);
    }

    #[tokio::test]
    async fn question_batch_is_all_or_nothing() {
        let repo = InMemoryRepository::new();
        let good = QuestionDraft::new("Q", ["a", "b", "c", "d"], Choice::A, Stage::FIRST, "h");
        let bad = QuestionDraft::new("  ", ["a", "b", "c", "d"], Choice::A, Stage::FINAL, "h");

        let err = repo
            .insert_questions(&[good.clone(), good.clone(), good.clone(), bad])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert_eq!(repo.count_questions().await.unwrap(), 0);

        let ids = repo.insert_questions(&[good.clone(), good]).await.unwrap();
        assert_eq!(ids.len(), 2);
        let listed: Vec<_> = repo
            .list_questions()
            .await
            .unwrap()
            .iter()
            .map(Question::id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn start_game_creates_then_reuses_player() {
        let repo = InMemoryRepository::new();
        let record = |role| NewPlayerRecord {
            name: "Ada".into(),
            role,
            created_at: fixed_now(),
        };

        let (ada, first) = repo.start_game(record(Role::Front), fixed_now()).await.unwrap();
        assert_eq!(ada.created_at(), fixed_now());
        assert_eq!(first.player_id(), ada.id());

        let later = fixed_now() + Duration::minutes(5);
        let (again, second) = repo.start_game(record(Role::Mobile), later).await.unwrap();
        assert_eq!(again.id(), ada.id());
        assert_eq!(again.role(), Role::Mobile);
        assert_eq!(second.started_at(), later);
        assert_ne!(second.id(), first.id());

        let stored = repo.get_player(ada.id()).await.unwrap().unwrap();
        assert_eq!(stored.role(), Role::Mobile);
    }

    #[tokio::test]
    async fn start_game_with_invalid_name_keeps_nothing() {
        let repo = InMemoryRepository::new();
        let err = repo
            .start_game(
                NewPlayerRecord {
                    name: String::new(),
                    role: Role::Back,
                    created_at: fixed_now(),
                },
                fixed_now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert!(repo.list_scores().await.unwrap().is_empty());
    }
}
