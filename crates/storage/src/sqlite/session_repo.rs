use chrono::{DateTime, Utc};
use quiz_core::model::{GameSession, Player, PlayerId, SessionId};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_score_row, map_session_row, session_id_from_i64};
use super::player_repo::{find_player_by_name_in, insert_player_in, update_player_role_in};
use crate::repository::{
    GameStartPersistence, NewPlayerRecord, NewSessionRecord, ScoreRecord, SessionRepository,
    StorageError,
};

const SESSION_COLUMNS: &str = r"
    id, player_id, started_at, stage, score, streak, completed,
    front_perk_used, back_perk_used, mobile_perk_used
";

/// Writes the mutable session fields inside an open transaction.
pub(super) async fn update_session_in(
    tx: &mut Transaction<'_, Sqlite>,
    session: &GameSession,
) -> Result<(), StorageError> {
    let perks = session.perks();
    let res = sqlx::query(
        r"
        UPDATE game_sessions SET
            stage = ?1,
            score = ?2,
            streak = ?3,
            completed = ?4,
            front_perk_used = ?5,
            back_perk_used = ?6,
            mobile_perk_used = ?7
        WHERE id = ?8
        ",
    )
    .bind(i64::from(session.stage().value()))
    .bind(i64::from(session.score()))
    .bind(i64::from(session.streak()))
    .bind(session.is_completed())
    .bind(perks.front)
    .bind(perks.back)
    .bind(perks.mobile)
    .bind(id_i64("session_id", session.id().value())?)
    .execute(&mut **tx)
    .await
    .map_err(conn)?;

    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

async fn insert_session_in(
    tx: &mut Transaction<'_, Sqlite>,
    session: NewSessionRecord,
) -> Result<GameSession, StorageError> {
    let res = sqlx::query(
        r"
        INSERT INTO game_sessions (player_id, started_at, stage, score, streak, completed)
        VALUES (?1, ?2, 1, 0, 0, 0)
        ",
    )
    .bind(id_i64("player_id", session.player_id.value())?)
    .bind(session.started_at)
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

    let id = session_id_from_i64(res.last_insert_rowid())?;
    Ok(GameSession::new(id, session.player_id, session.started_at))
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(
        &self,
        session: NewSessionRecord,
    ) -> Result<GameSession, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let created = insert_session_in(&mut tx, session).await?;
        tx.commit().await.map_err(conn)?;
        Ok(created)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<GameSession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = ?1"
        ))
        .bind(id_i64("session_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn update_session(&self, session: &GameSession) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        update_session_in(&mut tx, session).await?;
        tx.commit().await.map_err(conn)
    }

    async fn latest_session_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<GameSession>, StorageError> {
        let row = sqlx::query(&format!(
            r"
            SELECT {SESSION_COLUMNS} FROM game_sessions
            WHERE player_id = ?1
            ORDER BY started_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(id_i64("player_id", player_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn sessions_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<GameSession>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {SESSION_COLUMNS} FROM game_sessions
            WHERE player_id = ?1
            ORDER BY started_at DESC, id DESC
            "
        ))
        .bind(id_i64("player_id", player_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_session_row).collect()
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.id AS session_id, p.name AS player_name, s.score, s.started_at
            FROM game_sessions s
            JOIN players p ON p.id = s.player_id
            ORDER BY s.score DESC, s.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_score_row).collect()
    }
}

#[async_trait::async_trait]
impl GameStartPersistence for SqliteRepository {
    async fn start_game(
        &self,
        player: NewPlayerRecord,
        started_at: DateTime<Utc>,
    ) -> Result<(Player, GameSession), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing = find_player_by_name_in(&mut tx, &player.name).await?;
        let player = match existing {
            Some(mut existing) => {
                if existing.role() != player.role {
                    update_player_role_in(&mut tx, existing.id(), player.role).await?;
                    existing.set_role(player.role);
                }
                existing
            }
            None => insert_player_in(&mut tx, &player).await?,
        };
        let session = insert_session_in(
            &mut tx,
            NewSessionRecord {
                player_id: player.id(),
                started_at,
            },
        )
        .await?;

        tx.commit().await.map_err(conn)?;
        Ok((player, session))
    }
}
