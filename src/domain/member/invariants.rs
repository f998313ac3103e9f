use super::entity::Member;
use crate::domain::{DomainError, DomainResult};

/// Validates all Member invariants
/// These are the absolute rules that must hold for a Member to be valid
pub fn validate_member(member: &Member) -> DomainResult<()> {
    validate_username(&member.username)?;
    validate_age(member.age)?;
    Ok(())
}

/// Username cannot be empty
fn validate_username(username: &str) -> DomainResult<()> {
    if username.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Member username cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_age(age: i32) -> DomainResult<()> {
    if age < 0 {
        return Err(DomainError::InvariantViolation(format!(
            "Member age {} cannot be negative",
            age
        )));
    }
    Ok(())
}

/// Invariants that must hold true for Member:
///
/// 1. Username cannot be blank
/// 2. Age is never negative
/// 3. A member can exist without a team
/// 4. The referenced team must already be persisted
/// 5. Identity is assigned by the store and never changes

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_member() {
        assert!(validate_member(&Member::with_age("memberA", 10)).is_ok());
    }

    #[test]
    fn test_empty_username_fails() {
        assert!(validate_member(&Member::new("   ")).is_err());
    }

    #[test]
    fn test_negative_age_fails() {
        assert!(validate_member(&Member::with_age("memberA", -1)).is_err());
    }
}
