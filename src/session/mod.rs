// src/session/mod.rs
//
// Unit of work
//
// A Session owns one pooled connection and one open transaction for its
// whole life, plus an identity map of the entities it has handed out.
//
// INVARIANTS:
// 1. Every statement of a session runs in the same transaction
// 2. commit / rollback consume the session; dropping it unfinished rolls back
// 3. Lazy handles resolve only through the session that produced them,
//    and only while it is open
// 4. Bulk statements never touch the identity map

mod identity_map;
mod token;

#[cfg(test)]
mod session_tests;

pub use token::SessionToken;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use std::sync::Arc;

use crate::db::{get_connection, ConnectionPool, PooledConn};
use crate::domain::{Clock, Entity, Relation, SystemClock};
use crate::error::{AppError, AppResult};
use crate::query::sql::{render_count, render_delete, render_find_by_ids, render_insert, render_select, render_update};
use crate::query::{Condition, EntityGraph, Filter, Operator, Page, QueryDescriptor, QueryHints, SqlStatement};

use identity_map::IdentityMap;

pub struct Session {
    conn: PooledConn,
    token: SessionToken,
    identity_map: IdentityMap,
    clock: Arc<dyn Clock>,
    finished: bool,
}

impl Session {
    /// Check out a connection and open a transaction on it
    pub fn begin(pool: &ConnectionPool) -> AppResult<Self> {
        Self::begin_with_clock(pool, Arc::new(SystemClock))
    }

    pub fn begin_with_clock(pool: &ConnectionPool, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let conn = get_connection(pool)?;
        conn.execute_batch("BEGIN")?;

        let token = SessionToken::new();
        log::debug!("session {} begun", token.id());

        Ok(Self {
            conn,
            token,
            identity_map: IdentityMap::default(),
            clock,
            finished: false,
        })
    }

    pub fn commit(mut self) -> AppResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finish();
        log::debug!("session {} committed", self.token.id());
        Ok(())
    }

    pub fn rollback(mut self) -> AppResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        self.finish();
        log::debug!("session {} rolled back", self.token.id());
        Ok(())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.identity_map.clear();
        self.token.close();
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Audit time source
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Detach every cached entity
    pub fn clear(&mut self) {
        log::debug!(
            "session {} cleared {} cached entit(ies)",
            self.token.id(),
            self.identity_map.len()
        );
        self.identity_map.clear();
    }

    pub fn contains<E: Entity>(&self, id: i64) -> bool {
        self.identity_map.contains::<E>(id)
    }

    /// Detach one entity
    pub fn detach<E: Entity>(&mut self, entity: &E) {
        if let Some(id) = entity.id() {
            self.identity_map.evict::<E>(id);
        }
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Insert a new entity, assigning its id and stamping its audit fields
    pub fn persist<E: Entity>(&mut self, entity: &mut E) -> AppResult<()> {
        if entity.id().is_some() {
            return Err(AppError::ConstraintViolation(format!(
                "{} entity is already persisted",
                E::TABLE
            )));
        }
        entity.validate()?;
        let values = entity.field_values()?;

        let now = self.now();
        let audit = match entity.audit_mut() {
            Some(audit) => {
                audit.stamp(now);
                *audit
            }
            None => Default::default(),
        };

        render_insert::<E>(values, &audit).execute(&self.conn)?;
        let id = self.conn.last_insert_rowid();
        entity.assign_id(id);
        self.identity_map.put(entity);

        log::debug!("persisted {}#{}", E::TABLE, id);
        Ok(())
    }

    /// Write an entity's current state; inserts when it was never saved.
    /// Fails with NotFound when its row no longer exists.
    pub fn merge<E: Entity>(&mut self, entity: &mut E) -> AppResult<()> {
        let Some(id) = entity.id() else {
            return self.persist(entity);
        };
        entity.validate()?;
        let values = entity.field_values()?;

        let now = self.now();
        let mut audit = entity.audit().copied().unwrap_or_default();
        if audit.created_at().is_none() {
            audit = self.stored_audit::<E>(id)?;
        }
        audit.stamp(now);

        let affected = render_update::<E>(id, values, &audit).execute(&self.conn)?;
        if affected == 0 {
            return Err(AppError::NotFound);
        }
        if let Some(slot) = entity.audit_mut() {
            *slot = audit;
        }
        self.identity_map.put(entity);

        log::debug!("merged {}#{}", E::TABLE, id);
        Ok(())
    }

    /// Audit columns as stored, for an entity whose copy lost them
    fn stored_audit<E: Entity>(&self, id: i64) -> AppResult<crate::domain::Audit> {
        if !E::AUDITED {
            return Ok(Default::default());
        }
        let statement = SqlStatement::positional(
            format!("SELECT created_at, updated_at FROM {} WHERE id = ?1", E::TABLE),
            vec![id.into()],
        );
        statement
            .query_map(&self.conn, crate::domain::Audit::from_row)?
            .pop()
            .ok_or(AppError::NotFound)
    }

    pub fn remove<E: Entity>(&mut self, entity: &E) -> AppResult<()> {
        let id = entity.id().ok_or(AppError::NotFound)?;
        self.remove_by_id::<E>(id)
    }

    pub fn remove_by_id<E: Entity>(&mut self, id: i64) -> AppResult<()> {
        let affected = render_delete::<E>(id).execute(&self.conn)?;
        self.identity_map.evict::<E>(id);
        if affected == 0 {
            return Err(AppError::NotFound);
        }
        log::debug!("removed {}#{}", E::TABLE, id);
        Ok(())
    }

    /// Run a data-modifying statement; the identity map is left untouched
    pub fn execute(&mut self, statement: &SqlStatement) -> AppResult<usize> {
        Ok(statement.execute(&self.conn)?)
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Lookup by id, served from the identity map when cached
    pub fn find<E: Entity>(&mut self, id: i64) -> AppResult<Option<E>> {
        if let Some(cached) = self.identity_map.get::<E>(id) {
            return Ok(Some(cached.clone()));
        }
        let mut found = self.fetch::<E>(&by_id_statement::<E>(id)?, QueryHints::default())?;
        Ok(found.pop())
    }

    /// Entities for `ids` in id order; ids with no row are skipped
    pub fn find_all_by_ids<E: Entity>(&mut self, ids: &[i64]) -> AppResult<Vec<E>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !self.identity_map.contains::<E>(*id))
            .collect();
        if !missing.is_empty() {
            self.fetch::<E>(&render_find_by_ids::<E>(&missing), QueryHints::default())?;
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.identity_map.get::<E>(*id).cloned())
            .collect())
    }

    /// Map rows as `E`, registering them in the identity map unless the
    /// hints say read-only
    pub fn fetch<E: Entity>(&mut self, statement: &SqlStatement, hints: QueryHints) -> AppResult<Vec<E>> {
        let token = &self.token;
        let rows = statement.query_map(&self.conn, |row| E::from_row(row, token))?;

        if hints.read_only {
            return Ok(rows);
        }
        Ok(rows
            .into_iter()
            .map(|entity| self.identity_map.register(entity))
            .collect())
    }

    /// Map rows with `f`; nothing is cached
    pub fn fetch_mapped<T, F>(&self, statement: &SqlStatement, mut f: F) -> AppResult<Vec<T>>
    where
        F: FnMut(&Row<'_>, &SessionToken) -> rusqlite::Result<T>,
    {
        let token = &self.token;
        Ok(statement.query_map(&self.conn, |row| f(row, token))?)
    }

    /// First column of the first row as a count
    pub fn fetch_count(&self, statement: &SqlStatement) -> AppResult<u64> {
        let counts: Vec<i64> = statement.query_map(&self.conn, |row| row.get(0))?;
        Ok(counts.first().copied().unwrap_or(0).max(0) as u64)
    }

    pub fn query<E: Entity>(&mut self, descriptor: &QueryDescriptor, graph: &EntityGraph) -> AppResult<Vec<E>> {
        let statement = render_select::<E>(descriptor)?;
        let mut entities = self.fetch::<E>(&statement, descriptor.hints())?;
        self.apply_graph(&mut entities, graph)?;
        Ok(entities)
    }

    /// One window plus the total, both read in this transaction
    pub fn query_page<E: Entity>(&mut self, descriptor: &QueryDescriptor, graph: &EntityGraph) -> AppResult<Page<E>> {
        let request = descriptor
            .page()
            .cloned()
            .ok_or_else(|| AppError::query_syntax("paged query without a page request"))?;
        request.validate()?;

        let content = self.query::<E>(descriptor, graph)?;
        let total = self.count_where::<E>(descriptor.filter())?;
        Ok(Page::new(content, &request, total))
    }

    pub fn count_where<E: Entity>(&self, filter: &Filter) -> AppResult<u64> {
        self.fetch_count(&render_count::<E>(filter)?)
    }

    /// Load the relations `graph` names into `entities`
    pub fn apply_graph<E: Entity>(&mut self, entities: &mut [E], graph: &EntityGraph) -> AppResult<()> {
        if graph.is_empty() || entities.is_empty() {
            return Ok(());
        }
        E::fetch_relations(self, entities, graph)
    }

    // ========================================================================
    // RELATIONS
    // ========================================================================

    /// The relation's target, loading it through this session if needed
    pub fn resolve<T: Entity>(&mut self, relation: &Relation<T>) -> AppResult<T> {
        match relation {
            Relation::Loaded(target) => Ok((**target).clone()),
            Relation::Lazy(handle) => {
                if !handle.token().is_open() || handle.token() != &self.token {
                    return Err(AppError::StaleSession);
                }
                self.find::<T>(handle.id())?.ok_or(AppError::NotFound)
            }
        }
    }

    /// Replace a lazy handle with its loaded target
    pub fn initialize<T: Entity>(&mut self, relation: &mut Relation<T>) -> AppResult<()> {
        if !relation.is_loaded() {
            *relation = Relation::loaded(self.resolve(relation)?);
        }
        Ok(())
    }

    /// Reload `entity` from the store, replacing the cached copy
    pub fn refresh<E: Entity>(&mut self, entity: &mut E) -> AppResult<()> {
        let id = entity.id().ok_or(AppError::NotFound)?;
        self.identity_map.evict::<E>(id);

        let mut found = self.fetch::<E>(&by_id_statement::<E>(id)?, QueryHints::default())?;
        *entity = found.pop().ok_or(AppError::NotFound)?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("session {} dropped without commit; rolling back", self.token.id());
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("rollback of session {} failed: {}", self.token.id(), e);
            }
        }
        self.token.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("identity_map", &self.identity_map)
            .field("finished", &self.finished)
            .finish()
    }
}

fn by_id_statement<E: Entity>(id: i64) -> AppResult<SqlStatement> {
    render_select::<E>(&QueryDescriptor::filtered(
        Filter::all().and(Condition::new("id", Operator::Eq, id)),
    ))
}
