//! Streaks, evolution and milestones derived from the care log

pub mod evolution;
pub mod milestone;
pub mod streak;

pub use evolution::{EvolutionError, EvolutionOutcome, EvolutionProgress};
pub use milestone::{Milestone, MilestoneBook, RelationshipContext};
pub use streak::CareStreakInfo;
