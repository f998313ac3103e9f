// src/domain/dto.rs
//
// Flat projections returned by projection queries

use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Member id, username and the owning team's name.
/// Built from an inner join, so only members that belong to a team appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: i64,
    pub username: String,
    pub team_name: String,
}

impl MemberDto {
    pub fn new(id: i64, username: impl Into<String>, team_name: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            team_name: team_name.into(),
        }
    }

    /// Expects `id`, `username` and `team_name` columns
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            team_name: row.get("team_name")?,
        })
    }
}
