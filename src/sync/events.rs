//! Realtime notifications from the remote side

use serde::{Deserialize, Serialize};

use crate::care::action::CareAction;
use crate::core::types::PetId;
use crate::pet::Pet;

/// Change notification keyed by pet id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteEvent {
    /// The pet row changed (stats written, stage advanced)
    PetChanged { pet: Pet },
    /// A care action was inserted, by either partner
    CareActionInserted { action: CareAction },
}

impl RemoteEvent {
    pub fn pet_id(&self) -> PetId {
        match self {
            RemoteEvent::PetChanged { pet } => pet.id,
            RemoteEvent::CareActionInserted { action } => action.pet_id,
        }
    }
}
