use quiz_core::model::{AnswerLog, GameSession, SessionId};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_answer_row};
use super::session_repo::update_session_in;
use crate::repository::{AnswerLogRepository, AnswerPersistence, StorageError};

async fn insert_answer_in(
    tx: &mut Transaction<'_, Sqlite>,
    log: &AnswerLog,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r"
            INSERT INTO answer_logs (session_id, question_id, selected, is_correct, answered_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
        ",
    )
    .bind(id_i64("session_id", log.session_id.value())?)
    .bind(id_i64("question_id", log.question_id.value())?)
    .bind(log.selected.as_str())
    .bind(log.is_correct)
    .bind(log.answered_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_foreign_key_violation())
        {
            StorageError::NotFound
        } else {
            conn(e)
        }
    })?;

    Ok(res.last_insert_rowid())
}

#[async_trait::async_trait]
impl AnswerLogRepository for SqliteRepository {
    async fn append_answer(&self, log: &AnswerLog) -> Result<i64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let id = insert_answer_in(&mut tx, log).await?;
        tx.commit().await.map_err(conn)?;
        Ok(id)
    }

    async fn answers_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerLog>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT session_id, question_id, selected, is_correct, answered_at
                FROM answer_logs
                WHERE session_id = ?1
                ORDER BY answered_at ASC, id ASC
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_answer_row).collect()
    }

    async fn latest_answer(
        &self,
        session_id: SessionId,
    ) -> Result<Option<AnswerLog>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT session_id, question_id, selected, is_correct, answered_at
                FROM answer_logs
                WHERE session_id = ?1
                ORDER BY answered_at DESC, id DESC
                LIMIT 1
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_answer_row).transpose()
    }
}

#[async_trait::async_trait]
impl AnswerPersistence for SqliteRepository {
    async fn apply_answer(
        &self,
        session: &GameSession,
        log: &AnswerLog,
    ) -> Result<i64, StorageError> {
        if log.session_id != session.id() {
            return Err(StorageError::Conflict);
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;
        update_session_in(&mut tx, session).await?;
        let id = insert_answer_in(&mut tx, log).await?;
        tx.commit().await.map_err(conn)?;

        Ok(id)
    }
}
