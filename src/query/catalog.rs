// src/query/catalog.rs
//
// Startup-time registration of a repository's queries.
//
// Every declaration goes through the catalog so that name clashes, bad
// field/operator tables and SQL that does not prepare all fail while the
// repository is being constructed.

use rusqlite::Connection;
use std::collections::HashSet;

use crate::domain::Entity;
use crate::error::{AppError, AppResult};
use crate::query::finder::{BulkUpdate, BulkUpdateSpec, DerivedFinder, FinderSpec};
use crate::query::named::{NamedQuery, ParamKind};

pub struct QueryCatalog<'conn> {
    conn: &'conn Connection,
    repository: &'static str,
    names: HashSet<String>,
}

impl<'conn> QueryCatalog<'conn> {
    pub fn new(conn: &'conn Connection, repository: &'static str) -> Self {
        Self {
            conn,
            repository,
            names: HashSet::new(),
        }
    }

    fn claim(&mut self, name: &str) -> AppResult<()> {
        if !self.names.insert(name.to_string()) {
            return Err(AppError::query_syntax(format!(
                "{} declares '{}' more than once",
                self.repository, name
            )));
        }
        Ok(())
    }

    pub fn finder<E: Entity>(&mut self, spec: FinderSpec) -> AppResult<DerivedFinder<E>> {
        self.claim(spec.name())?;
        DerivedFinder::declare(spec)
    }

    pub fn bulk_update<E: Entity>(&mut self, spec: BulkUpdateSpec) -> AppResult<BulkUpdate<E>> {
        self.claim(spec.name())?;
        BulkUpdate::declare(spec)
    }

    pub fn named(&mut self, name: &str, sql: &str, params: &[(&str, ParamKind)]) -> AppResult<NamedQuery> {
        self.claim(name)?;
        let query = NamedQuery::declare(name, sql, params)?;
        query.verify(self.conn)?;
        Ok(query)
    }

    /// Names registered so far, for startup logging
    pub fn declared(&self) -> usize {
        self.names.len()
    }
}
