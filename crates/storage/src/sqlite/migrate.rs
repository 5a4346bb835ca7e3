use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates players, game sessions, the question catalog, answer logs and the
/// indexes backing "latest session by player" and "latest answer by session".
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS players (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    role TEXT NOT NULL CHECK (role IN ('front', 'back', 'mobile')),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS game_sessions (
                    id INTEGER PRIMARY KEY,
                    player_id INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    stage INTEGER NOT NULL CHECK (stage BETWEEN 1 AND 4),
                    score INTEGER NOT NULL CHECK (score >= 0),
                    streak INTEGER NOT NULL CHECK (streak >= 0),
                    completed INTEGER NOT NULL DEFAULT 0,
                    front_perk_used INTEGER NOT NULL DEFAULT 0,
                    back_perk_used INTEGER NOT NULL DEFAULT 0,
                    mobile_perk_used INTEGER NOT NULL DEFAULT 0,
                    FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    prompt TEXT NOT NULL,
                    choice_a TEXT NOT NULL,
                    choice_b TEXT NOT NULL,
                    choice_c TEXT NOT NULL,
                    choice_d TEXT NOT NULL,
                    correct_choice TEXT NOT NULL CHECK (correct_choice IN ('A', 'B', 'C', 'D')),
                    stage INTEGER NOT NULL CHECK (stage BETWEEN 1 AND 4),
                    hint TEXT NOT NULL DEFAULT ''
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_logs (
                    id INTEGER PRIMARY KEY,
                    session_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    selected TEXT NOT NULL CHECK (selected IN ('A', 'B', 'C', 'D')),
                    is_correct INTEGER NOT NULL,
                    answered_at TEXT NOT NULL,
                    FOREIGN KEY (session_id) REFERENCES game_sessions(id) ON DELETE CASCADE,
                    FOREIGN KEY (question_id) REFERENCES questions(id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_game_sessions_player_started
                    ON game_sessions (player_id, started_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_stage
                    ON questions (stage);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_answer_logs_session_answered_at
                    ON answer_logs (session_id, answered_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
