//! Remote persistence contract
//!
//! The transport behind this trait is out of scope; implementations only
//! have to classify their failures as transient or permanent so callers can
//! decide whether to retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::care::action::CareAction;
use crate::core::types::{CoupleId, PetId};
use crate::lifecycle::milestone::Milestone;
use crate::pet::personality::Personality;
use crate::pet::stage::Stage;
use crate::pet::stats::Stats;
use crate::pet::Pet;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Backend unreachable
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// Request did not complete in time
    #[error("remote timed out")]
    Timeout,

    #[error("{0} not found")]
    NotFound(String),

    /// The authority refused the write; retrying will not help
    #[error("rejected by remote: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// Whether retrying later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Timeout)
    }
}

/// Projection fields written after each care action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsUpdate {
    pub stats: Stats,
    pub personality: Personality,
    pub experience: u64,
    pub last_care_at: Option<DateTime<Utc>>,
}

impl StatsUpdate {
    pub fn from_pet(pet: &Pet) -> Self {
        Self {
            stats: pet.stats,
            personality: pet.personality,
            experience: pet.experience,
            last_care_at: pet.last_care_at,
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_pet(&self, pet: &Pet) -> Result<(), RemoteError>;

    async fn get_pet(&self, pet_id: PetId) -> Result<Pet, RemoteError>;

    async fn update_pet_stats(&self, pet_id: PetId, update: &StatsUpdate) -> Result<(), RemoteError>;

    /// Appending an id that already exists is a no-op
    async fn append_care_action(&self, action: &CareAction) -> Result<(), RemoteError>;

    /// Stages never move backwards; an older stage is a no-op
    async fn update_stage(&self, pet_id: PetId, stage: Stage) -> Result<(), RemoteError>;

    /// A title already unlocked for the couple is a no-op
    async fn create_milestone(&self, milestone: &Milestone) -> Result<(), RemoteError>;

    async fn list_milestones(&self, couple_id: CoupleId) -> Result<Vec<Milestone>, RemoteError>;

    /// Most recent `limit` actions, oldest first
    async fn list_care_actions(&self, pet_id: PetId, limit: usize) -> Result<Vec<CareAction>, RemoteError>;
}
