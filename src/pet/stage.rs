//! Ordered life stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Life stage of a pet
///
/// Declaration order is the evolution order; a pet only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Stage {
    Egg = 0,
    Baby = 1,
    Child = 2,
    Teen = 3,
    Adult = 4,
    Elder = 5,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Egg,
        Stage::Baby,
        Stage::Child,
        Stage::Teen,
        Stage::Adult,
        Stage::Elder,
    ];

    /// The stage directly after this one, `None` for Elder
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Egg => Some(Stage::Baby),
            Stage::Baby => Some(Stage::Child),
            Stage::Child => Some(Stage::Teen),
            Stage::Teen => Some(Stage::Adult),
            Stage::Adult => Some(Stage::Elder),
            Stage::Elder => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    /// Care is disabled until the egg hatches
    pub fn accepts_care(&self) -> bool {
        *self != Stage::Egg
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Egg => "Egg",
            Stage::Baby => "Baby",
            Stage::Child => "Child",
            Stage::Teen => "Teen",
            Stage::Adult => "Adult",
            Stage::Elder => "Elder",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
