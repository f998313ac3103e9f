// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories hold declarations only, never connections or entities
// - Every operation runs inside the caller's Session
// - Declarations are validated in constructors, never at call time
// - NO cross-repository calls

pub mod crud_repository;
pub mod manual_member_repository;
pub mod member_repository;
pub mod team_repository;


pub use crud_repository::{CrudRepository, SqliteCrudRepository};
pub use manual_member_repository::ManualMemberRepository;
pub use member_repository::{MemberRepository, SqliteMemberRepository};
pub use team_repository::{SqliteTeamRepository, TeamRepository};
