use quiz_core::model::{Player, PlayerId, Role};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_player_row, player_id_from_i64, ser};
use crate::repository::{NewPlayerRecord, PlayerRepository, StorageError};

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub(super) async fn find_player_by_name_in(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
) -> Result<Option<Player>, StorageError> {
    let row = sqlx::query("SELECT id, name, role, created_at FROM players WHERE name = ?1")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(conn)?;

    row.as_ref().map(map_player_row).transpose()
}

pub(super) async fn insert_player_in(
    tx: &mut Transaction<'_, Sqlite>,
    player: &NewPlayerRecord,
) -> Result<Player, StorageError> {
    let res = sqlx::query(
        r"
        INSERT INTO players (name, role, created_at)
        VALUES (?1, ?2, ?3)
        ",
    )
    .bind(player.name.as_str())
    .bind(player.role.as_str())
    .bind(player.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StorageError::Conflict
        } else {
            conn(e)
        }
    })?;

    let id = player_id_from_i64(res.last_insert_rowid())?;
    Player::new(id, &player.name, player.role, player.created_at).map_err(ser)
}

pub(super) async fn update_player_role_in(
    tx: &mut Transaction<'_, Sqlite>,
    id: PlayerId,
    role: Role,
) -> Result<(), StorageError> {
    let res = sqlx::query("UPDATE players SET role = ?1 WHERE id = ?2")
        .bind(role.as_str())
        .bind(id_i64("player_id", id.value())?)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;

    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

#[async_trait::async_trait]
impl PlayerRepository for SqliteRepository {
    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, role, created_at
            FROM players WHERE name = ?1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_player_row).transpose()
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, role, created_at
            FROM players WHERE id = ?1
            ",
        )
        .bind(id_i64("player_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_player_row).transpose()
    }

    async fn insert_player(&self, player: NewPlayerRecord) -> Result<Player, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let created = insert_player_in(&mut tx, &player).await?;
        tx.commit().await.map_err(conn)?;
        Ok(created)
    }

    async fn update_player_role(&self, id: PlayerId, role: Role) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        update_player_role_in(&mut tx, id, role).await?;
        tx.commit().await.map_err(conn)
    }
}
