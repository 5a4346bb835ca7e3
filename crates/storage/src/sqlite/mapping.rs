use quiz_core::model::{
    AnswerLog, Choice, GameSession, PerkFlags, Player, PlayerId, Question, QuestionDraft,
    QuestionId, Role, SessionId, Stage,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ScoreRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn player_id_from_i64(v: i64) -> Result<PlayerId, StorageError> {
    Ok(PlayerId::new(i64_to_u64("player_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn choice_from_row(row: &SqliteRow, column: &str) -> Result<Choice, StorageError> {
    row.try_get::<String, _>(column)
        .map_err(ser)?
        .parse::<Choice>()
        .map_err(ser)
}

pub(crate) fn map_player_row(row: &SqliteRow) -> Result<Player, StorageError> {
    let role = row
        .try_get::<String, _>("role")
        .map_err(ser)?
        .parse::<Role>()
        .map_err(ser)?;
    Player::new(
        player_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        &row.try_get::<String, _>("name").map_err(ser)?,
        role,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<GameSession, StorageError> {
    let stage = Stage::try_from(row.try_get::<i64, _>("stage").map_err(ser)?).map_err(ser)?;
    let perks = PerkFlags {
        front: row.try_get("front_perk_used").map_err(ser)?,
        back: row.try_get("back_perk_used").map_err(ser)?,
        mobile: row.try_get("mobile_perk_used").map_err(ser)?,
    };
    Ok(GameSession::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        player_id_from_i64(row.try_get::<i64, _>("player_id").map_err(ser)?)?,
        row.try_get("started_at").map_err(ser)?,
        stage,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64("streak", row.try_get::<i64, _>("streak").map_err(ser)?)?,
        row.try_get("completed").map_err(ser)?,
        perks,
    ))
}

pub(crate) fn map_score_row(row: &SqliteRow) -> Result<ScoreRecord, StorageError> {
    Ok(ScoreRecord {
        session_id: session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        player_name: row.try_get("player_name").map_err(ser)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        started_at: row.try_get("started_at").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let draft = QuestionDraft {
        prompt: row.try_get("prompt").map_err(ser)?,
        choices: [
            row.try_get("choice_a").map_err(ser)?,
            row.try_get("choice_b").map_err(ser)?,
            row.try_get("choice_c").map_err(ser)?,
            row.try_get("choice_d").map_err(ser)?,
        ],
        correct: choice_from_row(row, "correct_choice")?,
        stage: Stage::try_from(row.try_get::<i64, _>("stage").map_err(ser)?).map_err(ser)?,
        hint: row.try_get("hint").map_err(ser)?,
    };
    draft
        .assign_id(question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?)
        .map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<AnswerLog, StorageError> {
    Ok(AnswerLog::new(
        session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        choice_from_row(row, "selected")?,
        row.try_get("is_correct").map_err(ser)?,
        row.try_get("answered_at").map_err(ser)?,
    ))
}
