use rusqlite::Row;
use serde::Serialize;

use crate::domain::audit::{parse_timestamp, Audit};
use crate::domain::model::{same_identity, Entity, FieldDef, FieldKind};
use crate::domain::DomainResult;
use crate::error::AppResult;
use crate::query::Value;
use crate::session::SessionToken;

const TEAM_FIELDS: &[FieldDef] = &[FieldDef::new("name", FieldKind::Text)];

/// A team members can belong to
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    /// Store-assigned identifier, `None` until first save
    id: Option<i64>,

    pub name: String,

    #[serde(flatten)]
    audit: Audit,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            audit: Audit::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.audit.created_at()
    }

    pub fn updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.audit.updated_at()
    }

    /// Map a joined row whose team columns carry `prefix`
    pub fn from_prefixed_row(row: &Row<'_>, prefix: &str) -> rusqlite::Result<Option<Self>> {
        let id: Option<i64> = row.get(format!("{}id", prefix).as_str())?;
        let Some(id) = id else {
            return Ok(None);
        };

        Ok(Some(Self {
            id: Some(id),
            name: row.get(format!("{}name", prefix).as_str())?,
            audit: Audit::restored(
                parse_timestamp(row, &format!("{}created_at", prefix))?,
                parse_timestamp(row, &format!("{}updated_at", prefix))?,
            ),
        }))
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        same_identity(self, other)
    }
}

impl Eq for Team {}

impl Entity for Team {
    const TABLE: &'static str = "team";

    fn fields() -> &'static [FieldDef] {
        TEAM_FIELDS
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
        super::validate_team(self)
    }

    fn field_values(&self) -> AppResult<Vec<Value>> {
        Ok(vec![Value::from(self.name.as_str())])
    }

    fn from_row(row: &Row<'_>, _token: &SessionToken) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            audit: Audit::from_row(row)?,
        })
    }
}
