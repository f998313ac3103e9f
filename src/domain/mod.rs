// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file MUST declare all domain modules and re-export their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod audit;
pub mod dto;
pub mod member;
pub mod model;
pub mod relation;
pub mod team;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Entity contract
pub use model::{same_identity, Entity, FieldDef, FieldKind, RelationDef};

// Auditing
pub use audit::{Audit, Clock, SystemClock};

// Relations
pub use relation::{LazyRef, Relation};

// Member Domain
pub use member::{validate_member, Member};

// Team Domain
pub use team::{validate_team, Team};

// Projections
pub use dto::MemberDto;

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
