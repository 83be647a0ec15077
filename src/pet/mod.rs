//! The shared pet and its derived views
//!
//! `Pet` is a cached projection. The care log plus elapsed time is the
//! source of truth, see [`crate::care::projection`].

pub mod personality;
pub mod stage;
pub mod stats;

pub use personality::{Personality, PersonalityTrait, TraitNudge};
pub use stage::Stage;
pub use stats::{DecayRates, StatDelta, StatKind, Stats};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::calendar::elapsed_hours;
use crate::core::config::PetConfig;
use crate::core::types::{CoupleId, PetId, Species};

/// Shared pet owned by a couple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    pub couple_id: CoupleId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: Species,
    pub stage: Stage,
    /// Stats as of [`Pet::decay_reference`]
    pub stats: Stats,
    /// Stats at creation, the starting point for replaying the care log
    #[serde(default)]
    pub birth_stats: Stats,
    #[serde(default)]
    pub personality: Personality,
    #[serde(default)]
    pub experience: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_care_at: Option<DateTime<Utc>>,
}

impl Pet {
    /// New unhatched pet
    pub fn new(couple_id: CoupleId, name: impl Into<String>, species: Species, now: DateTime<Utc>) -> Self {
        let stats = Stats::default();
        Self {
            id: PetId::new(),
            couple_id,
            name: name.into(),
            species,
            stage: Stage::Egg,
            stats,
            birth_stats: stats,
            personality: Personality::default(),
            experience: 0,
            created_at: now,
            last_care_at: None,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self.birth_stats = stats;
        self
    }

    /// Instant decay is measured from: last care, or creation if never cared for
    pub fn decay_reference(&self) -> DateTime<Utc> {
        self.last_care_at.unwrap_or(self.created_at)
    }

    /// Stats with decay applied up to `now`; the stored projection is untouched
    pub fn current_stats(&self, now: DateTime<Utc>, config: &PetConfig) -> Stats {
        self.stats
            .decayed(elapsed_hours(self.decay_reference(), now), &config.decay)
    }

    pub fn dominant_trait(&self) -> PersonalityTrait {
        self.personality.dominant()
    }

    pub fn mood(&self, now: DateTime<Utc>, config: &PetConfig) -> Mood {
        Mood::from_stats(&self.current_stats(now, config))
    }

    /// Stats currently below the attention threshold
    pub fn needs_attention(&self, now: DateTime<Utc>, config: &PetConfig) -> Vec<StatKind> {
        self.current_stats(now, config)
            .below(config.attention_threshold)
    }

    /// Move the stage forward to `stage`; never moves it back
    ///
    /// Returns true if the stage changed.
    pub fn raise_stage(&mut self, stage: Stage) -> bool {
        if stage > self.stage {
            self.stage = stage;
            true
        } else {
            false
        }
    }

    /// Repair values a degraded remote record may carry
    pub fn sanitized(mut self) -> Self {
        self.stats = self.stats.sanitized();
        self.birth_stats = self.birth_stats.sanitized();
        self.personality = self.personality.sanitized();
        self
    }
}

/// Coarse wellbeing summary derived from the average of current stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Thriving,
    Content,
    Needy,
    Neglected,
}

impl Mood {
    pub fn from_stats(stats: &Stats) -> Self {
        let avg = stats.average();
        if avg >= 80.0 {
            Mood::Thriving
        } else if avg >= 50.0 {
            Mood::Content
        } else if avg >= 25.0 {
            Mood::Needy
        } else {
            Mood::Neglected
        }
    }
}
