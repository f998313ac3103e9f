// src/query/mod.rs
//
// Query derivation
//
// Turns declared finders, named SQL and structured descriptors into
// statements the store executes. Nothing here talks to the store directly;
// execution goes through the Session.

pub mod catalog;
pub mod descriptor;
pub mod finder;
pub mod graph;
pub mod named;
pub mod page;
pub mod predicate;
pub mod sort;
pub mod sql;
pub mod value;

pub use catalog::QueryCatalog;
pub use descriptor::{QueryDescriptor, QueryHints};
pub use finder::{BulkUpdate, BulkUpdateSpec, DerivedFinder, FinderSpec, UpdateOp};
pub use graph::EntityGraph;
pub use named::{NamedParams, NamedQuery, ParamKind};
pub use page::{Page, PageRequest};
pub use predicate::{Clause, Condition, Filter, Operator};
pub use sort::{Direction, Order, Sort};
pub use sql::{Bindings, SqlStatement};
pub use value::Value;
