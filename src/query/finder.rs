// src/query/finder.rs
//
// Derived finders and bulk updates
//
// Both are declared up front as field/operator tables and validated when
// declared. At call time only the argument values are checked.

use std::marker::PhantomData;

use crate::domain::audit::format_timestamp;
use crate::domain::{Entity, FieldKind};
use crate::error::{AppError, AppResult};
use crate::query::descriptor::{QueryDescriptor, QueryHints};
use crate::query::graph::EntityGraph;
use crate::query::page::{Page, PageRequest};
use crate::query::predicate::{Arity, Clause, Condition, Filter, Operator};
use crate::query::sort::Sort;
use crate::query::sql::{render_bulk_touch, SqlStatement};
use crate::query::value::Value;
use crate::session::Session;

/// Declaration of a derived finder
#[derive(Debug, Clone)]
pub struct FinderSpec {
    name: String,
    clauses: Vec<Clause>,
    sort: Sort,
    graph: Vec<String>,
    hints: QueryHints,
}

impl FinderSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clauses: Vec::new(),
            sort: Sort::unsorted(),
            graph: Vec::new(),
            hints: QueryHints::default(),
        }
    }

    /// Add a field/operator clause; clauses are ANDed in declaration order
    pub fn by(mut self, field: &str, op: Operator) -> Self {
        self.clauses.push(Clause::new(field, op));
        self
    }

    pub fn order_by(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn fetch(mut self, attribute_paths: &[&str]) -> Self {
        self.graph = attribute_paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn hints(mut self, hints: QueryHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A validated, executable finder over `E`
#[derive(Debug, Clone)]
pub struct DerivedFinder<E: Entity> {
    name: String,
    clauses: Vec<Clause>,
    sort: Sort,
    graph: EntityGraph,
    hints: QueryHints,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> DerivedFinder<E> {
    pub fn declare(spec: FinderSpec) -> AppResult<Self> {
        if spec.name.trim().is_empty() {
            return Err(AppError::query_syntax("finder name cannot be empty"));
        }
        if spec.clauses.is_empty() {
            return Err(AppError::query_syntax(format!(
                "finder '{}' declares no clauses",
                spec.name
            )));
        }
        for clause in &spec.clauses {
            clause
                .validate::<E>()
                .map_err(|e| AppError::query_syntax(format!("finder '{}': {}", spec.name, e)))?;
        }
        spec.sort.validate::<E>()?;

        let paths: Vec<&str> = spec.graph.iter().map(String::as_str).collect();
        let graph = EntityGraph::of::<E>(&paths)?;

        log::debug!("declared finder {}.{}", E::TABLE, spec.name);

        Ok(Self {
            name: spec.name,
            clauses: spec.clauses,
            sort: spec.sort,
            graph,
            hints: spec.hints,
            _entity: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of argument values a call must supply
    pub fn arity(&self) -> usize {
        self.clauses
            .iter()
            .filter(|c| c.op.arity() != Arity::None)
            .count()
    }

    /// Pair arguments with clauses; fails before touching the store
    pub fn bind(&self, args: Vec<Value>) -> AppResult<Filter> {
        if args.len() != self.arity() {
            return Err(AppError::query_syntax(format!(
                "finder '{}' expects {} argument(s), got {}",
                self.name,
                self.arity(),
                args.len()
            )));
        }

        let mut args = args.into_iter();
        let mut filter = Filter::all();
        for clause in &self.clauses {
            let value = match clause.op.arity() {
                Arity::None => None,
                _ => args.next(),
            };
            filter = filter.and(Condition {
                clause: clause.clone(),
                value,
            });
        }

        filter
            .validate::<E>()
            .map_err(|e| AppError::query_syntax(format!("finder '{}': {}", self.name, e)))?;
        Ok(filter)
    }

    fn descriptor(&self, args: Vec<Value>) -> AppResult<QueryDescriptor> {
        Ok(QueryDescriptor::filtered(self.bind(args)?)
            .sorted(self.sort.clone())
            .with_hints(self.hints))
    }

    pub fn find(&self, session: &mut Session, args: Vec<Value>) -> AppResult<Vec<E>> {
        let descriptor = self.descriptor(args)?;
        session.query(&descriptor, &self.graph)
    }

    pub fn find_sorted(&self, session: &mut Session, args: Vec<Value>, sort: Sort) -> AppResult<Vec<E>> {
        let descriptor = self.descriptor(args)?.sorted(sort);
        session.query(&descriptor, &self.graph)
    }

    /// At most one result; more than one is an error
    pub fn find_one(&self, session: &mut Session, args: Vec<Value>) -> AppResult<Option<E>> {
        let mut results = self.find(session, args)?;
        match results.len() {
            0 => Ok(None),
            1 => Ok(results.pop()),
            n => Err(AppError::NonUniqueResult(n)),
        }
    }

    pub fn find_page(&self, session: &mut Session, args: Vec<Value>, request: &PageRequest) -> AppResult<Page<E>> {
        let descriptor = self.descriptor(args)?.paged(request.clone());
        session.query_page(&descriptor, &self.graph)
    }

    pub fn count(&self, session: &mut Session, args: Vec<Value>) -> AppResult<u64> {
        let filter = self.bind(args)?;
        session.count_where::<E>(&filter)
    }

    pub fn exists(&self, session: &mut Session, args: Vec<Value>) -> AppResult<bool> {
        Ok(self.count(session, args)? > 0)
    }
}

/// Per-column change applied by a bulk update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(Value),
    Increment(i64),
}

/// Declaration of a bulk conditional update
#[derive(Debug, Clone)]
pub struct BulkUpdateSpec {
    name: String,
    assignments: Vec<(String, UpdateOp)>,
    clauses: Vec<Clause>,
    clear_automatically: bool,
}

impl BulkUpdateSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assignments: Vec::new(),
            clauses: Vec::new(),
            clear_automatically: false,
        }
    }

    pub fn set(mut self, field: &str, op: UpdateOp) -> Self {
        self.assignments.push((field.to_string(), op));
        self
    }

    pub fn by(mut self, field: &str, op: Operator) -> Self {
        self.clauses.push(Clause::new(field, op));
        self
    }

    /// Clear the session identity map after executing
    pub fn clear_automatically(mut self) -> Self {
        self.clear_automatically = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A validated bulk update over `E`; bypasses the session identity map
#[derive(Debug, Clone)]
pub struct BulkUpdate<E: Entity> {
    name: String,
    assignments: Vec<(String, UpdateOp)>,
    finder: DerivedFinder<E>,
    clear_automatically: bool,
}

impl<E: Entity> BulkUpdate<E> {
    pub fn declare(spec: BulkUpdateSpec) -> AppResult<Self> {
        if spec.assignments.is_empty() {
            return Err(AppError::query_syntax(format!(
                "bulk update '{}' assigns nothing",
                spec.name
            )));
        }

        for (field, op) in &spec.assignments {
            let kind = E::fields()
                .iter()
                .find(|f| f.name == field.as_str())
                .map(|f| f.kind)
                .ok_or_else(|| {
                    AppError::query_syntax(format!(
                        "bulk update '{}': '{}' is not an updatable field of {}",
                        spec.name,
                        field,
                        E::TABLE
                    ))
                })?;

            let valid = match op {
                UpdateOp::Increment(_) => kind == FieldKind::Integer,
                UpdateOp::Set(value) => !value.is_list() && value.fits(kind),
            };
            if !valid {
                return Err(AppError::query_syntax(format!(
                    "bulk update '{}': {:?} does not suit {}.{}",
                    spec.name,
                    op,
                    E::TABLE,
                    field
                )));
            }
        }

        let finder = DerivedFinder::declare(FinderSpec {
            name: spec.name.clone(),
            clauses: spec.clauses,
            sort: Sort::unsorted(),
            graph: Vec::new(),
            hints: QueryHints::default(),
        })?;

        Ok(Self {
            name: spec.name,
            assignments: spec.assignments,
            finder,
            clear_automatically: spec.clear_automatically,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, filter: &Filter, now: chrono::DateTime<chrono::Utc>) -> SqlStatement {
        let mut values = Vec::new();
        let mut sets = Vec::new();

        for (field, op) in &self.assignments {
            match op {
                UpdateOp::Set(value) => {
                    values.push(value.clone());
                    sets.push(format!("{} = ?{}", field, values.len()));
                }
                UpdateOp::Increment(delta) => {
                    values.push(Value::Integer(*delta));
                    sets.push(format!("{field} = {field} + ?{}", values.len()));
                }
            }
        }
        if E::AUDITED {
            values.push(Value::Text(format_timestamp(now)));
            sets.push(render_bulk_touch(values.len()));
        }

        let where_clause = filter.render_where(&mut values);
        let sql = format!("UPDATE {} SET {}{}", E::TABLE, sets.join(", "), where_clause);
        SqlStatement::positional(sql, values)
    }

    /// Apply to every matching row; returns the affected count.
    /// Entities already held by the session are NOT updated unless the
    /// update was declared with `clear_automatically`.
    pub fn execute(&self, session: &mut Session, args: Vec<Value>) -> AppResult<usize> {
        let filter = self.finder.bind(args)?;
        let statement = self.render(&filter, session.now());
        let affected = session.execute(&statement)?;

        log::debug!("bulk update {}.{} affected {} row(s)", E::TABLE, self.name, affected);

        if self.clear_automatically {
            session.clear();
        }
        Ok(affected)
    }
}
