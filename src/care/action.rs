//! Care action records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{CareActionId, PartnerId, PetId};

/// Kind of care a partner can give
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareActionType {
    Feed,
    Play,
    Walk,
    Pet,
    Groom,
}

impl CareActionType {
    pub const ALL: [CareActionType; 5] = [
        CareActionType::Feed,
        CareActionType::Play,
        CareActionType::Walk,
        CareActionType::Pet,
        CareActionType::Groom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CareActionType::Feed => "feed",
            CareActionType::Play => "play",
            CareActionType::Walk => "walk",
            CareActionType::Pet => "pet",
            CareActionType::Groom => "groom",
        }
    }
}

impl fmt::Display for CareActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable record of one applied care action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CareAction {
    pub id: CareActionId,
    pub pet_id: PetId,
    pub actor: PartnerId,
    pub action_type: CareActionType,
    pub performed_at: DateTime<Utc>,
}

impl CareAction {
    pub fn new(pet_id: PetId, actor: PartnerId, action_type: CareActionType, performed_at: DateTime<Utc>) -> Self {
        Self {
            id: CareActionId::new(),
            pet_id,
            actor,
            action_type,
            performed_at,
        }
    }

    /// Key the log is ordered by; ids break timestamp ties
    pub fn order_key(&self) -> (DateTime<Utc>, CareActionId) {
        (self.performed_at, self.id)
    }
}
