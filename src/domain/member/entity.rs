use rusqlite::Row;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::audit::Audit;
use crate::domain::model::{same_identity, Entity, FieldDef, FieldKind, RelationDef};
use crate::domain::relation::Relation;
use crate::domain::team::Team;
use crate::domain::DomainResult;
use crate::error::{AppError, AppResult};
use crate::query::{EntityGraph, Value};
use crate::session::{Session, SessionToken};

const MEMBER_FIELDS: &[FieldDef] = &[
    FieldDef::new("username", FieldKind::Text),
    FieldDef::new("age", FieldKind::Integer),
    FieldDef::new("team_id", FieldKind::Reference("team")),
];

const MEMBER_RELATIONS: &[RelationDef] = &[RelationDef {
    name: "team",
    column: "team_id",
    target: "team",
}];

/// A member, optionally belonging to a team
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    /// Store-assigned identifier, `None` until first save
    id: Option<i64>,

    pub username: String,

    pub age: i32,

    /// Owning side of the member -> team relation
    team: Option<Relation<Team>>,

    #[serde(flatten)]
    audit: Audit,
}

impl Member {
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_age(username, 0)
    }

    pub fn with_age(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team: None,
            audit: Audit::default(),
        }
    }

    pub fn with_team(username: impl Into<String>, age: i32, team: &Team) -> Self {
        let mut member = Self::with_age(username, age);
        member.change_team(team);
        member
    }

    /// Point this member at `team`
    pub fn change_team(&mut self, team: &Team) {
        self.team = Some(Relation::loaded(team.clone()));
    }

    pub fn leave_team(&mut self) {
        self.team = None;
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn age(&self) -> i32 {
        self.age
    }

    pub fn team(&self) -> Option<&Relation<Team>> {
        self.team.as_ref()
    }

    pub fn team_mut(&mut self) -> Option<&mut Relation<Team>> {
        self.team.as_mut()
    }

    pub fn team_id(&self) -> Option<i64> {
        self.team.as_ref().and_then(Relation::id)
    }

    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.audit.created_at()
    }

    pub fn updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.audit.updated_at()
    }

    /// Member columns by name plus an already-loaded team
    pub(crate) fn from_row_with_team(row: &Row<'_>, team: Option<Team>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            username: row.get("username")?,
            age: row.get("age")?,
            team: team.map(Relation::loaded),
            audit: Audit::from_row(row)?,
        })
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        same_identity(self, other)
    }
}

impl Eq for Member {}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "Member(id={}, username={}, age={})", id, self.username, self.age),
            None => write!(f, "Member(unsaved, username={}, age={})", self.username, self.age),
        }
    }
}

impl Entity for Member {
    const TABLE: &'static str = "member";

    fn fields() -> &'static [FieldDef] {
        MEMBER_FIELDS
    }

    fn relations() -> &'static [RelationDef] {
        MEMBER_RELATIONS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn audit(&self) -> Option<&Audit> {
        Some(&self.audit)
    }

    fn audit_mut(&mut self) -> Option<&mut Audit> {
        Some(&mut self.audit)
    }

    fn validate(&self) -> DomainResult<()> {
        super::validate_member(self)
    }

    fn field_values(&self) -> AppResult<Vec<Value>> {
        let team_id = match &self.team {
            None => Value::Null,
            Some(relation) => relation.id().map(Value::Integer).ok_or_else(|| {
                AppError::ConstraintViolation(format!(
                    "member '{}' references a team that has not been saved",
                    self.username
                ))
            })?,
        };

        Ok(vec![
            Value::from(self.username.as_str()),
            Value::from(self.age),
            team_id,
        ])
    }

    fn from_row(row: &Row<'_>, token: &SessionToken) -> rusqlite::Result<Self> {
        let team_id: Option<i64> = row.get("team_id")?;
        Ok(Self {
            id: Some(row.get("id")?),
            username: row.get("username")?,
            age: row.get("age")?,
            team: team_id.map(|id| Relation::lazy(id, token.clone())),
            audit: Audit::from_row(row)?,
        })
    }

    fn fetch_relations(session: &mut Session, members: &mut [Self], graph: &EntityGraph) -> AppResult<()> {
        if !graph.includes("team") {
            return Ok(());
        }

        let mut pending: Vec<i64> = members
            .iter()
            .filter_map(|m| match &m.team {
                Some(Relation::Lazy(handle)) => Some(handle.id()),
                _ => None,
            })
            .collect();
        pending.sort_unstable();
        pending.dedup();

        if pending.is_empty() {
            return Ok(());
        }

        let teams: HashMap<i64, Team> = session
            .find_all_by_ids::<Team>(&pending)?
            .into_iter()
            .filter_map(|team| team.id().map(|id| (id, team)))
            .collect();

        for member in members.iter_mut() {
            if let Some(Relation::Lazy(handle)) = &member.team {
                if let Some(team) = teams.get(&handle.id()) {
                    member.team = Some(Relation::loaded(team.clone()));
                }
            }
        }

        Ok(())
    }
}
