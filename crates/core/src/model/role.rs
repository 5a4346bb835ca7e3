use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoleError {
    #[error("unknown role: {0}")]
    Unknown(String),
}

/// Player specialty. Each role owns exactly one perk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Front,
    Back,
    Mobile,
}

/// Presentation text for the perk owned by a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RolePerk {
    pub label: &'static str,
    pub description: &'static str,
    pub action_label: &'static str,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Front, Role::Back, Role::Mobile];

    /// Stable storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Front => "front",
            Role::Back => "back",
            Role::Mobile => "mobile",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Role::Front => "Front-end developer",
            Role::Back => "Back-end developer",
            Role::Mobile => "Mobile developer",
        }
    }

    #[must_use]
    pub fn perk(self) -> RolePerk {
        match self {
            Role::Front => RolePerk {
                label: "Switch question",
                description: "Skip to the next question once per game.",
                action_label: "Switch",
            },
            Role::Back => RolePerk {
                label: "Automatic catch-up",
                description: "Soften a wrong answer once per game.",
                action_label: "Catch up",
            },
            Role::Mobile => RolePerk {
                label: "Hint",
                description: "Reveal a hint once per game.",
                action_label: "Hint",
            },
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(Role::Front),
            "back" => Ok(Role::Back),
            "mobile" => Ok(Role::Mobile),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
