// src/domain/model.rs
//
// The Entity contract every persisted record implements

use rusqlite::Row;

use crate::domain::audit::Audit;
use crate::domain::DomainResult;
use crate::error::AppResult;
use crate::query::{EntityGraph, Value};
use crate::session::{Session, SessionToken};

/// Storage class of a persisted column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    /// Foreign key to the named table
    Reference(&'static str),
}

/// A persisted column other than the identifier and audit columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// A navigable relation, backed by a reference column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub column: &'static str,
    pub target: &'static str,
}

/// A persisted record.
///
/// The identifier is `None` until the store assigns one on first save and
/// never changes afterwards.
pub trait Entity: Clone + std::fmt::Debug + Send + 'static {
    /// Backing table
    const TABLE: &'static str;

    /// Whether the table carries `created_at` / `updated_at`
    const AUDITED: bool = true;

    /// Persisted fields in insert order
    fn fields() -> &'static [FieldDef];

    fn relations() -> &'static [RelationDef] {
        &[]
    }

    fn id(&self) -> Option<i64>;

    /// Called once by the store on insert
    fn assign_id(&mut self, id: i64);

    fn audit(&self) -> Option<&Audit> {
        None
    }

    fn audit_mut(&mut self) -> Option<&mut Audit> {
        None
    }

    fn validate(&self) -> DomainResult<()> {
        Ok(())
    }

    /// Values for `fields()`, same order
    fn field_values(&self) -> AppResult<Vec<Value>>;

    /// Build from a row, reading columns by name. Relations come back as
    /// lazy handles bound to `token`.
    fn from_row(row: &Row<'_>, token: &SessionToken) -> rusqlite::Result<Self>;

    /// Load the relations named by `graph` into already-fetched entities
    fn fetch_relations(_session: &mut Session, _entities: &mut [Self], _graph: &EntityGraph) -> AppResult<()> {
        Ok(())
    }

    /// Kind of any queryable column, including `id` and audit columns
    fn column_kind(name: &str) -> Option<FieldKind> {
        match name {
            "id" => Some(FieldKind::Integer),
            "created_at" | "updated_at" if Self::AUDITED => Some(FieldKind::Text),
            _ => Self::fields().iter().find(|f| f.name == name).map(|f| f.kind),
        }
    }
}

/// Identity-based equality: equal iff both ids are assigned and equal,
/// otherwise only the same instance is equal to itself
pub fn same_identity<E: Entity>(a: &E, b: &E) -> bool {
    match (a.id(), b.id()) {
        (Some(x), Some(y)) => x == y,
        _ => std::ptr::eq(a, b),
    }
}
