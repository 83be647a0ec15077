//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a pet
    PetId
);
uuid_id!(
    /// Unique identifier for a couple (the pet's owners)
    CoupleId
);
uuid_id!(
    /// Unique identifier for one partner of a couple
    PartnerId
);
uuid_id!(
    /// Unique identifier for a care action record
    ///
    /// Ordered so that replays can break timestamp ties deterministically.
    CareActionId
);
uuid_id!(
    /// Unique identifier for a milestone record
    MilestoneId
);

/// Cosmetic species of the shared pet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    #[default]
    Cat,
    Dog,
    Bunny,
    Dragon,
    Fox,
}

impl Species {
    pub const ALL: [Species; 5] = [
        Species::Cat,
        Species::Dog,
        Species::Bunny,
        Species::Dragon,
        Species::Fox,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Species::Cat => "cat",
            Species::Dog => "dog",
            Species::Bunny => "bunny",
            Species::Dragon => "dragon",
            Species::Fox => "fox",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .into_iter()
            .find(|species| species.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown species '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = PetId::new();
        let b = PetId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashMap;
        let id = CoupleId::new();
        let mut map: HashMap<CoupleId, &str> = HashMap::new();
        map.insert(id, "us");
        assert_eq!(map.get(&id), Some(&"us"));
    }

    #[test]
    fn test_species_serializes_snake_case() {
        let json = serde_json::to_string(&Species::Dragon).unwrap();
        assert_eq!(json, "\"dragon\"");
    }

    #[test]
    fn test_species_parses_case_insensitively() {
        assert_eq!("Dragon".parse::<Species>(), Ok(Species::Dragon));
        assert_eq!(" fox ".parse::<Species>(), Ok(Species::Fox));
        assert!("griffin".parse::<Species>().is_err());
    }
}
