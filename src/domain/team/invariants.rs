use super::entity::Team;
use crate::domain::{DomainError, DomainResult};

/// Validates all Team invariants
pub fn validate_team(team: &Team) -> DomainResult<()> {
    if team.name.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Team name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Invariants that must hold true for Team:
///
/// 1. Name cannot be blank
/// 2. Identity is assigned by the store and never changes
/// 3. A team can exist without members
