// src/query/sql.rs
//
// SQL statements and the renderers that derive them from descriptors.
//
// Renderers only emit identifiers that come from Entity metadata, and every
// descriptor is validated before rendering, so user input only ever reaches
// the store as bound values.

use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection, Row};

use crate::domain::audit::format_timestamp;
use crate::domain::{Audit, Entity};
use crate::error::AppResult;
use crate::query::descriptor::QueryDescriptor;
use crate::query::predicate::Filter;
use crate::query::value::Value;

/// Parameter bindings for a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Bindings {
    Positional(Vec<Value>),
    /// Names carry their `:` prefix
    Named(Vec<(String, Value)>),
}

/// Rendered SQL plus its bindings
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub bindings: Bindings,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self::positional(sql, Vec::new())
    }

    pub fn positional(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Bindings::Positional(values),
        }
    }

    pub fn named(sql: impl Into<String>, pairs: Vec<(String, Value)>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Bindings::Named(pairs),
        }
    }

    pub(crate) fn query_map<T, F>(&self, conn: &Connection, f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        log::debug!("query: {} {:?}", self.sql, self.bindings);
        let mut stmt = conn.prepare(&self.sql)?;

        let rows = match &self.bindings {
            Bindings::Positional(values) => stmt.query_map(params_from_iter(values.iter()), f)?,
            Bindings::Named(pairs) => {
                let named: Vec<(&str, &dyn ToSql)> = pairs
                    .iter()
                    .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
                    .collect();
                stmt.query_map(named.as_slice(), f)?
            }
        };

        rows.collect()
    }

    pub(crate) fn execute(&self, conn: &Connection) -> rusqlite::Result<usize> {
        log::debug!("execute: {} {:?}", self.sql, self.bindings);
        let mut stmt = conn.prepare(&self.sql)?;

        match &self.bindings {
            Bindings::Positional(values) => stmt.execute(params_from_iter(values.iter())),
            Bindings::Named(pairs) => {
                let named: Vec<(&str, &dyn ToSql)> = pairs
                    .iter()
                    .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
                    .collect();
                stmt.execute(named.as_slice())
            }
        }
    }
}

/// `id, field..., created_at, updated_at` for `E`
pub fn select_columns<E: Entity>() -> String {
    let mut columns = vec!["id"];
    columns.extend(E::fields().iter().map(|f| f.name));
    if E::AUDITED {
        columns.extend(["created_at", "updated_at"]);
    }
    columns.join(", ")
}

/// SELECT for a validated descriptor, windowed when it carries a page
pub fn render_select<E: Entity>(descriptor: &QueryDescriptor) -> AppResult<SqlStatement> {
    descriptor.validate::<E>()?;

    let mut values = Vec::new();
    let mut sql = format!("SELECT {} FROM {}", select_columns::<E>(), E::TABLE);
    sql.push_str(&descriptor.filter().render_where(&mut values));
    sql.push_str(&descriptor.effective_sort().render_order_by());

    if let Some(page) = descriptor.page() {
        let (limit, offset) = page.window()?;
        values.push(Value::Integer(limit));
        values.push(Value::Integer(offset));
        sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", values.len() - 1, values.len()));
    }

    Ok(SqlStatement::positional(sql, values))
}

/// COUNT(*) over the descriptor's filter, ignoring sort and page
pub fn render_count<E: Entity>(filter: &Filter) -> AppResult<SqlStatement> {
    filter.validate::<E>()?;

    let mut values = Vec::new();
    let sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        E::TABLE,
        filter.render_where(&mut values)
    );
    Ok(SqlStatement::positional(sql, values))
}

pub fn render_insert<E: Entity>(values: Vec<Value>, audit: &Audit) -> SqlStatement {
    let mut columns: Vec<&str> = E::fields().iter().map(|f| f.name).collect();
    let mut values = values;
    if E::AUDITED {
        columns.extend(["created_at", "updated_at"]);
        values.extend(audit_values(audit));
    }

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    );
    SqlStatement::positional(sql, values)
}

/// `updated_at` assignment for set-based updates, clamped to the row's own
/// `created_at` since no entity passes through the audit hook
pub fn render_bulk_touch(param: usize) -> String {
    format!("updated_at = MAX(COALESCE(created_at, ?{param}), ?{param})")
}

/// UPDATE by id; `created_at` is never written after insert
pub fn render_update<E: Entity>(id: i64, values: Vec<Value>, audit: &Audit) -> SqlStatement {
    let mut assignments: Vec<String> = E::fields()
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{} = ?{}", f.name, i + 1))
        .collect();
    let mut values = values;
    if E::AUDITED {
        values.push(audit.updated_at().map(format_timestamp).into());
        assignments.push(format!("updated_at = ?{}", values.len()));
    }
    values.push(Value::Integer(id));

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        E::TABLE,
        assignments.join(", "),
        values.len()
    );
    SqlStatement::positional(sql, values)
}

pub fn render_delete<E: Entity>(id: i64) -> SqlStatement {
    SqlStatement::positional(
        format!("DELETE FROM {} WHERE id = ?1", E::TABLE),
        vec![Value::Integer(id)],
    )
}

pub fn render_find_by_ids<E: Entity>(ids: &[i64]) -> SqlStatement {
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {} FROM {} WHERE id IN ({}) ORDER BY id ASC",
        select_columns::<E>(),
        E::TABLE,
        placeholders.join(", ")
    );
    SqlStatement::positional(sql, ids.iter().map(|id| Value::Integer(*id)).collect())
}

fn audit_values(audit: &Audit) -> [Value; 2] {
    [
        audit.created_at().map(format_timestamp).into(),
        audit.updated_at().map(format_timestamp).into(),
    ]
}
