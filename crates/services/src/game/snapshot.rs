use chrono::{DateTime, Utc};
use serde::Serialize;

use quiz_core::model::{
    AnswerStats, Choice, GameSession, PerkFlags, Player, Question, QuestionId, Role, RolePerk,
    SessionId, Stage,
};
use storage::repository::ScoreRecord;

//
// ─── QUESTION VIEW ─────────────────────────────────────────────────────────────
//

/// One labeled answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub label: Choice,
    pub text: String,
}

/// A question as shown to the player: no correct choice, no hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub stage: Stage,
    pub choices: Vec<ChoiceView>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id(),
            prompt: question.prompt().to_string(),
            stage: question.stage(),
            choices: question
                .choices()
                .map(|(label, text)| ChoiceView {
                    label,
                    text: text.to_string(),
                })
                .collect(),
        }
    }
}

//
// ─── SESSION SNAPSHOT ──────────────────────────────────────────────────────────
//

/// Immutable, point-in-time view of a session returned after every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub player_name: String,
    pub role: Role,
    pub role_label: &'static str,
    pub role_perk: RolePerk,
    pub stage: Stage,
    pub stage_label: &'static str,
    pub score: u32,
    pub streak: u32,
    pub current_question: Option<QuestionView>,
    pub completed: bool,
    pub perk_used: bool,
    pub perks: PerkFlags,
    pub correct_answers: u32,
    pub total_answers: u32,
    /// Percentage of correct answers, 0.0 before the first answer.
    pub accuracy: f64,
}

impl SessionSnapshot {
    pub(crate) fn assemble(
        player: &Player,
        session: &GameSession,
        stats: AnswerStats,
        current: Option<&Question>,
    ) -> Self {
        let role = player.role();
        Self {
            session_id: session.id(),
            player_name: player.name().to_string(),
            role,
            role_label: role.label(),
            role_perk: role.perk(),
            stage: session.stage(),
            stage_label: session.stage().label(),
            score: session.score(),
            streak: session.streak(),
            current_question: current.map(QuestionView::from),
            completed: session.is_completed(),
            perk_used: session.perk_used(),
            perks: session.perks(),
            correct_answers: stats.correct,
            total_answers: stats.total,
            accuracy: stats.accuracy(),
        }
    }
}

//
// ─── PERK / SCORE RESULTS ──────────────────────────────────────────────────────
//

/// What the hint perk revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum HintOutcome {
    Hint(String),
    AlreadyUsed,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobilePerkResult {
    pub hint: HintOutcome,
    pub snapshot: SessionSnapshot,
}

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub session_id: SessionId,
    pub player_name: String,
    pub score: u32,
    pub started_at: DateTime<Utc>,
}

impl From<ScoreRecord> for ScoreEntry {
    fn from(record: ScoreRecord) -> Self {
        Self {
            session_id: record.session_id,
            player_name: record.player_name,
            score: record.score,
            started_at: record.started_at,
        }
    }
}
