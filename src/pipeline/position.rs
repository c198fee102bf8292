//! Role labels and free-text position normalization
//!
//! FBref lists one or more comma-separated positions per player ("DF,MF").
//! Every player is reduced to exactly one [`Role`] using an explicit priority
//! order; the default is defensive-first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One of the four normalized position categories.
///
/// The derived ordering (DF, MF, FW, GK) is the row order of every output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "DF")]
    Defender,
    #[serde(rename = "MF")]
    Midfielder,
    #[serde(rename = "FW")]
    Forward,
    #[serde(rename = "GK")]
    Goalkeeper,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Defender,
        Role::Midfielder,
        Role::Forward,
        Role::Goalkeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Defender => "DF",
            Role::Midfielder => "MF",
            Role::Forward => "FW",
            Role::Goalkeeper => "GK",
        }
    }

    /// Match a single position token, accepting FBref codes and long names.
    fn from_token(token: &str) -> Option<Role> {
        match token.to_ascii_uppercase().as_str() {
            "GK" | "G" | "GOALKEEPER" | "KEEPER" => Some(Role::Goalkeeper),
            "DF" | "D" | "DEF" | "DEFENDER" => Some(Role::Defender),
            "MF" | "M" | "MID" | "MIDFIELDER" | "MIDFIELD" => Some(Role::Midfielder),
            "FW" | "F" | "FWD" | "ATT" | "FORWARD" | "ATTACKER" | "STRIKER" => {
                Some(Role::Forward)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ConfigError;

    /// Parse a configuration role label. Only the four canonical codes are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DF" => Ok(Role::Defender),
            "MF" => Ok(Role::Midfielder),
            "FW" => Ok(Role::Forward),
            "GK" => Ok(Role::Goalkeeper),
            _ => Err(ConfigError::UnknownRole(s.to_string())),
        }
    }
}

/// Defensive-first tie-break: a player listed as "DF,MF" is a defender.
pub const DEFAULT_POSITION_PRIORITY: [Role; 4] = [
    Role::Goalkeeper,
    Role::Defender,
    Role::Midfielder,
    Role::Forward,
];

/// Check that a priority order names every role exactly once.
pub fn validate_priority(priority: &[Role]) -> Result<(), ConfigError> {
    for role in Role::ALL {
        let count = priority.iter().filter(|r| **r == role).count();
        if count != 1 {
            return Err(ConfigError::InvalidValue {
                field: "cleaner.position_priority",
                reason: format!(
                    "role {} appears {} time(s); every role must appear exactly once",
                    role, count
                ),
            });
        }
    }
    Ok(())
}

/// Normalize a free-text position label into a single role.
///
/// Tokens are split on commas, slashes, hyphens and whitespace. Unrecognized
/// tokens are ignored; if no token is recognized the result is `None`.
pub fn normalize_position(label: &str, priority: &[Role]) -> Option<Role> {
    let listed: Vec<Role> = label
        .split(|c: char| c == ',' || c == '/' || c == '-' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .filter_map(Role::from_token)
        .collect();

    priority.iter().copied().find(|role| listed.contains(role))
}
