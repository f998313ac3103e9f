pub mod entity;
pub mod invariants;

pub use entity::Team;
pub use invariants::validate_team;
