// src/repositories/crud_repository.rs
//
// Generic CRUD over any Entity
//
// Every operation runs inside the caller's Session. Repositories hold only
// declarations, never connections or entity state.

use std::marker::PhantomData;

use crate::domain::Entity;
use crate::error::{AppError, AppResult};
use crate::query::{Condition, EntityGraph, Filter, Operator, Page, PageRequest, QueryDescriptor, Sort, SqlStatement};
use crate::session::Session;

pub trait CrudRepository<E: Entity>: Send + Sync {
    /// Relations loaded with every `find_all*` result
    fn fetch_graph(&self) -> &EntityGraph;

    /// Insert when unsaved, update otherwise. Audit fields are stamped here.
    fn save(&self, session: &mut Session, entity: E) -> AppResult<E> {
        let mut entity = entity;
        session.merge(&mut entity)?;
        Ok(entity)
    }

    fn save_all(&self, session: &mut Session, entities: Vec<E>) -> AppResult<Vec<E>> {
        entities
            .into_iter()
            .map(|entity| self.save(session, entity))
            .collect()
    }

    /// `Ok(None)` when absent
    fn find_by_id(&self, session: &mut Session, id: i64) -> AppResult<Option<E>> {
        session.find::<E>(id)
    }

    /// Mandatory lookup
    fn get_by_id(&self, session: &mut Session, id: i64) -> AppResult<E> {
        self.find_by_id(session, id)?.ok_or(AppError::NotFound)
    }

    fn exists_by_id(&self, session: &mut Session, id: i64) -> AppResult<bool> {
        if session.contains::<E>(id) {
            return Ok(true);
        }
        let filter = Filter::all().and(Condition::new("id", Operator::Eq, id));
        Ok(session.count_where::<E>(&filter)? > 0)
    }

    /// Every row, ordered by id
    fn find_all(&self, session: &mut Session) -> AppResult<Vec<E>> {
        session.query(&QueryDescriptor::all(), self.fetch_graph())
    }

    fn find_all_sorted(&self, session: &mut Session, sort: Sort) -> AppResult<Vec<E>> {
        session.query(&QueryDescriptor::all().sorted(sort), self.fetch_graph())
    }

    fn find_all_paged(&self, session: &mut Session, request: &PageRequest) -> AppResult<Page<E>> {
        session.query_page(&QueryDescriptor::all().paged(request.clone()), self.fetch_graph())
    }

    fn count(&self, session: &mut Session) -> AppResult<u64> {
        session.count_where::<E>(&Filter::all())
    }

    /// NotFound for an unsaved or already-deleted entity
    fn delete(&self, session: &mut Session, entity: &E) -> AppResult<()> {
        session.remove(entity)
    }

    fn delete_by_id(&self, session: &mut Session, id: i64) -> AppResult<()> {
        session.remove_by_id::<E>(id)
    }

    /// Single-statement delete of every row; clears the session afterwards
    fn delete_all(&self, session: &mut Session) -> AppResult<usize> {
        let affected = session.execute(&SqlStatement::new(format!("DELETE FROM {}", E::TABLE)))?;
        session.clear();
        Ok(affected)
    }
}

/// CRUD for an entity type with no repository of its own
#[derive(Debug, Clone)]
pub struct SqliteCrudRepository<E: Entity> {
    graph: EntityGraph,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqliteCrudRepository<E> {
    pub fn new() -> Self {
        Self {
            graph: EntityGraph::empty(),
            _entity: PhantomData,
        }
    }

    /// Load `attribute_paths` with every `find_all*` result
    pub fn with_fetch_graph(attribute_paths: &[&str]) -> AppResult<Self> {
        Ok(Self {
            graph: EntityGraph::of::<E>(attribute_paths)?,
            _entity: PhantomData,
        })
    }
}

impl<E: Entity> Default for SqliteCrudRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> CrudRepository<E> for SqliteCrudRepository<E> {
    fn fetch_graph(&self) -> &EntityGraph {
        &self.graph
    }
}
