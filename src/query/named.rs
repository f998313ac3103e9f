// src/query/named.rs
//
// Explicit queries: SQL text with `:name` parameters
//
// The placeholders found in the text must equal the declared parameter set.
// Binding checks supplied names against the declaration and fails with
// QuerySyntax before anything is sent to the store.

use regex::{Captures, Regex};
use rusqlite::types::FromSql;
use rusqlite::{Connection, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::domain::Entity;
use crate::error::{AppError, AppResult};
use crate::query::descriptor::QueryHints;
use crate::query::graph::EntityGraph;
use crate::query::sql::SqlStatement;
use crate::query::value::Value;
use crate::session::{Session, SessionToken};

/// String literals are matched first so placeholders inside them are skipped
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|:([A-Za-z_][A-Za-z0-9_]*)"#)
            .expect("placeholder pattern is valid")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar,
    /// Expanded into `(:name_0, :name_1, ...)` when bound
    List,
}

/// Supplied parameter values, keyed by name (without the `:` prefix)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    values: BTreeMap<String, Value>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.trim_start_matches(':').to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

#[derive(Debug, Clone)]
pub struct NamedQuery {
    name: String,
    sql: String,
    params: BTreeMap<String, ParamKind>,
}

impl NamedQuery {
    /// Declare a query; placeholders must match `params` exactly
    pub fn declare(name: &str, sql: &str, params: &[(&str, ParamKind)]) -> AppResult<Self> {
        if sql.trim().is_empty() {
            return Err(AppError::query_syntax(format!("query '{}' has no SQL", name)));
        }

        let found: BTreeSet<String> = placeholder_pattern()
            .captures_iter(sql)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect();
        let declared: BTreeMap<String, ParamKind> = params
            .iter()
            .map(|(param, kind)| (param.to_string(), *kind))
            .collect();

        if let Some(missing) = found.iter().find(|p| !declared.contains_key(*p)) {
            return Err(AppError::query_syntax(format!(
                "query '{}' uses undeclared parameter :{}",
                name, missing
            )));
        }
        if let Some(unused) = declared.keys().find(|p| !found.contains(*p)) {
            return Err(AppError::query_syntax(format!(
                "query '{}' declares :{} but never uses it",
                name, unused
            )));
        }

        Ok(Self {
            name: name.to_string(),
            sql: sql.to_string(),
            params: declared,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Prepare against the live schema with placeholder values
    pub fn verify(&self, conn: &Connection) -> AppResult<()> {
        let sample = self
            .params
            .iter()
            .fold(NamedParams::new(), |acc, (param, kind)| match kind {
                ParamKind::Scalar => acc.set(param, Value::Null),
                ParamKind::List => acc.set(param, Value::List(vec![Value::Null])),
            });
        let statement = self.render(&sample)?;

        conn.prepare(&statement.sql).map_err(|e| {
            AppError::query_syntax(format!("query '{}' failed to prepare: {}", self.name, e))
        })?;
        Ok(())
    }

    /// Check supplied parameters and produce a bound statement
    pub fn render(&self, params: &NamedParams) -> AppResult<SqlStatement> {
        for (param, kind) in &self.params {
            let value = params.get(param).ok_or_else(|| {
                AppError::query_syntax(format!(
                    "query '{}' is missing parameter :{}",
                    self.name, param
                ))
            })?;
            if (*kind == ParamKind::List) != value.is_list() {
                return Err(AppError::query_syntax(format!(
                    "query '{}' parameter :{} expects a {}, got {}",
                    self.name,
                    param,
                    if *kind == ParamKind::List { "list" } else { "scalar" },
                    value.type_name()
                )));
            }
        }
        if let Some(extra) = params.values.keys().find(|p| !self.params.contains_key(*p)) {
            return Err(AppError::query_syntax(format!(
                "query '{}' has no parameter :{}",
                self.name, extra
            )));
        }

        let sql = placeholder_pattern()
            .replace_all(&self.sql, |caps: &Captures| match caps.get(1) {
                Some(param) => match params.get(param.as_str()) {
                    Some(Value::List(items)) if items.is_empty() => "(NULL)".to_string(),
                    Some(Value::List(items)) => {
                        let expanded: Vec<String> = (0..items.len())
                            .map(|i| format!(":{}_{}", param.as_str(), i))
                            .collect();
                        format!("({})", expanded.join(", "))
                    }
                    _ => caps[0].to_string(),
                },
                None => caps[0].to_string(),
            })
            .into_owned();

        let mut bindings = Vec::new();
        for (param, value) in &params.values {
            match value {
                Value::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        bindings.push((format!(":{}_{}", param, i), item.clone()));
                    }
                }
                scalar => bindings.push((format!(":{}", param), scalar.clone())),
            }
        }

        Ok(SqlStatement::named(sql, bindings))
    }

    /// Rows mapped as entities (columns matched by name)
    pub fn fetch<E: Entity>(&self, session: &mut Session, params: &NamedParams) -> AppResult<Vec<E>> {
        let statement = self.render(params)?;
        session.fetch(&statement, QueryHints::default())
    }

    /// Entities plus an eager fetch graph
    pub fn fetch_with_graph<E: Entity>(
        &self,
        session: &mut Session,
        params: &NamedParams,
        graph: &EntityGraph,
    ) -> AppResult<Vec<E>> {
        let mut entities = self.fetch(session, params)?;
        session.apply_graph(&mut entities, graph)?;
        Ok(entities)
    }

    /// First column of every row
    pub fn fetch_column<V: FromSql>(&self, session: &mut Session, params: &NamedParams) -> AppResult<Vec<V>> {
        let statement = self.render(params)?;
        session.fetch_mapped(&statement, |row, _| row.get(0))
    }

    /// Rows mapped by a caller-supplied projection
    pub fn fetch_mapped<T, F>(&self, session: &mut Session, params: &NamedParams, f: F) -> AppResult<Vec<T>>
    where
        F: FnMut(&Row<'_>, &SessionToken) -> rusqlite::Result<T>,
    {
        let statement = self.render(params)?;
        session.fetch_mapped(&statement, f)
    }

    /// Data-modifying query; bypasses the session identity map
    pub fn execute_update(&self, session: &mut Session, params: &NamedParams) -> AppResult<usize> {
        let statement = self.render(params)?;
        session.execute(&statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::create_test_connection;
    use crate::db::initialize_database;
    use crate::query::sql::Bindings;

    const FIND_USER: &str = "SELECT * FROM member WHERE username = :username AND age = :age";

    fn find_user() -> NamedQuery {
        NamedQuery::declare(
            "findUser",
            FIND_USER,
            &[("username", ParamKind::Scalar), ("age", ParamKind::Scalar)],
        )
        .unwrap()
    }

    #[test]
    fn test_declared_params_must_match_text() {
        let undeclared = NamedQuery::declare("q", FIND_USER, &[("username", ParamKind::Scalar)]);
        assert!(matches!(undeclared, Err(AppError::QuerySyntax(_))));

        let unused = NamedQuery::declare(
            "q",
            "SELECT * FROM member",
            &[("username", ParamKind::Scalar)],
        );
        assert!(matches!(unused, Err(AppError::QuerySyntax(_))));
    }

    #[test]
    fn test_placeholders_inside_literals_ignored() {
        let query = NamedQuery::declare(
            "q",
            "SELECT * FROM member WHERE username = ':not_a_param' AND age = :age",
            &[("age", ParamKind::Scalar)],
        );
        assert!(query.is_ok());
    }

    #[test]
    fn test_missing_parameter_fails_before_store() {
        let err = find_user()
            .render(&NamedParams::new().set("username", "AAA"))
            .unwrap_err();
        assert!(matches!(err, AppError::QuerySyntax(ref m) if m.contains(":age")), "{:?}", err);
    }

    #[test]
    fn test_unexpected_and_mistyped_parameters_rejected() {
        let extra = find_user().render(
            &NamedParams::new()
                .set("username", "AAA")
                .set("age", 10)
                .set("team", 1),
        );
        assert!(matches!(extra, Err(AppError::QuerySyntax(_))));

        let list_for_scalar = find_user().render(
            &NamedParams::new()
                .set("username", vec!["AAA"])
                .set("age", 10),
        );
        assert!(matches!(list_for_scalar, Err(AppError::QuerySyntax(_))));
    }

    #[test]
    fn test_list_parameters_expand() {
        let query = NamedQuery::declare(
            "findByNames",
            "SELECT * FROM member WHERE username IN :names",
            &[("names", ParamKind::List)],
        )
        .unwrap();

        let stmt = query
            .render(&NamedParams::new().set("names", vec!["memberAA", "memberBB"]))
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM member WHERE username IN (:names_0, :names_1)");
        assert_eq!(
            stmt.bindings,
            Bindings::Named(vec![
                (":names_0".to_string(), Value::from("memberAA")),
                (":names_1".to_string(), Value::from("memberBB")),
            ])
        );

        let empty = query
            .render(&NamedParams::new().set("names", Vec::<String>::new()))
            .unwrap();
        assert_eq!(empty.sql, "SELECT * FROM member WHERE username IN (NULL)");
    }

    #[test]
    fn test_verify_against_schema() {
        let conn = create_test_connection().unwrap();
        initialize_database(&conn).unwrap();

        assert!(find_user().verify(&conn).is_ok());

        let broken = NamedQuery::declare(
            "broken",
            "SELECT nickname FROM member WHERE age > :age",
            &[("age", ParamKind::Scalar)],
        )
        .unwrap();
        assert!(matches!(broken.verify(&conn), Err(AppError::QuerySyntax(_))));
    }
}
