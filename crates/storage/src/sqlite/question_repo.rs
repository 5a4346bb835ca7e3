use quiz_core::model::{Question, QuestionDraft, QuestionId};

use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_question_row, question_id_from_i64, ser};
use crate::repository::{QuestionRepository, StorageError};

async fn insert_question_in(
    tx: &mut Transaction<'_, Sqlite>,
    draft: &QuestionDraft,
) -> Result<QuestionId, StorageError> {
    draft.validate().map_err(ser)?;
    let [a, b, c, d] = &draft.choices;

    let res = sqlx::query(
        r"
        INSERT INTO questions (
            prompt, choice_a, choice_b, choice_c, choice_d, correct_choice, stage, hint
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
    )
    .bind(draft.prompt.as_str())
    .bind(a.as_str())
    .bind(b.as_str())
    .bind(c.as_str())
    .bind(d.as_str())
    .bind(draft.correct.as_str())
    .bind(i64::from(draft.stage.value()))
    .bind(draft.hint.as_str())
    .execute(&mut **tx)
    .await
    .map_err(conn)?;

    question_id_from_i64(res.last_insert_rowid())
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn count_questions(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u64::try_from(count).map_err(ser)
    }

    async fn insert_question(&self, draft: &QuestionDraft) -> Result<QuestionId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let id = insert_question_in(&mut tx, draft).await?;
        tx.commit().await.map_err(conn)?;
        Ok(id)
    }

    async fn insert_questions(
        &self,
        drafts: &[QuestionDraft],
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            ids.push(insert_question_in(&mut tx, draft).await?);
        }
        tx.commit().await.map_err(conn)?;
        Ok(ids)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, prompt, choice_a, choice_b, choice_c, choice_d, correct_choice, stage, hint
            FROM questions
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, prompt, choice_a, choice_b, choice_c, choice_d, correct_choice, stage, hint
            FROM questions WHERE id = ?1
            ",
        )
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }
}
