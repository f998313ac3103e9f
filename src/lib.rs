// src/lib.rs
// DataRepo - Typed repository layer over SQLite
//
// Architecture:
// - Domain-centric: entities, audit metadata and relations live in `domain`
// - Declarative: finders, named queries and bulk updates are declared once
//   and validated when their repository is constructed
// - Explicit: every operation runs inside a caller-owned Session
// - No hidden loading: lazy relations resolve only through their session

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;

// ============================================================================
// QUERY DERIVATION & UNIT OF WORK
// ============================================================================

pub mod query;
pub mod session;

// ============================================================================
// REPOSITORY FACADE
// ============================================================================

pub mod repositories;

// ============================================================================
// PUBLIC API - Domain
// ============================================================================

pub use domain::{
    validate_member,
    validate_team,
    Audit,
    Clock,
    Entity,
    // Member
    Member,
    MemberDto,
    Relation,
    SystemClock,
    // Team
    Team,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Configuration & Database
// ============================================================================

pub use config::StoreConfig;
pub use db::{create_connection_pool, initialize_database, ConnectionPool};

// ============================================================================
// PUBLIC API - Queries
// ============================================================================

pub use query::{
    Direction, EntityGraph, NamedParams, Operator, Order, Page, PageRequest, QueryHints, Sort,
};

// ============================================================================
// PUBLIC API - Session & Repositories
// ============================================================================

pub use session::Session;

pub use repositories::{
    CrudRepository,
    ManualMemberRepository,
    MemberRepository,
    SqliteCrudRepository,
    SqliteMemberRepository,
    SqliteTeamRepository,
    TeamRepository,
};
