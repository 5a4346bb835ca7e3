use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{PlayerId, Role};

pub const PLAYER_NAME_MAX_LEN: usize = 120;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("player name cannot be empty")]
    EmptyName,

    #[error("player name exceeds {max} characters ({len})", max = PLAYER_NAME_MAX_LEN)]
    NameTooLong { len: usize },
}

/// Validates and normalizes a player name (surrounding whitespace is trimmed).
///
/// # Errors
///
/// Returns `PlayerError::EmptyName` or `PlayerError::NameTooLong`.
pub fn normalize_player_name(raw: &str) -> Result<String, PlayerError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PlayerError::EmptyName);
    }
    let len = name.chars().count();
    if len > PLAYER_NAME_MAX_LEN {
        return Err(PlayerError::NameTooLong { len });
    }
    Ok(name.to_string())
}

/// A named player. Names are unique across the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    name: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl Player {
    /// # Errors
    ///
    /// Returns `PlayerError` if the name does not validate.
    pub fn new(
        id: PlayerId,
        name: &str,
        role: Role,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PlayerError> {
        Ok(Self {
            id,
            name: normalize_player_name(name)?,
            role,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Roles are not fixed across restarts; starting a new game may reassign it.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn name_is_trimmed() {
        let player = Player::new(PlayerId::new(1), "  Ada  ", Role::Back, fixed_now()).unwrap();
        assert_eq!(player.name(), "Ada");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Player::new(PlayerId::new(1), "   ", Role::Back, fixed_now()).unwrap_err();
        assert_eq!(err, PlayerError::EmptyName);
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(PLAYER_NAME_MAX_LEN + 1);
        let err = normalize_player_name(&name).unwrap_err();
        assert!(matches!(err, PlayerError::NameTooLong { len } if len == PLAYER_NAME_MAX_LEN + 1));
    }

    #[test]
    fn role_can_be_reassigned() {
        let mut player = Player::new(PlayerId::new(1), "Ada", Role::Back, fixed_now()).unwrap();
        player.set_role(Role::Mobile);
        assert_eq!(player.role(), Role::Mobile);
    }
}
