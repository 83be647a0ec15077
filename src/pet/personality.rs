//! Personality drift from care actions
//!
//! Every applied care action nudges one or more trait weights upward. Weights
//! are capped at 100 each and never decay. The dominant trait is derived, so
//! it is recomputed after every change rather than stored as truth.

use serde::{Deserialize, Serialize};

/// Baseline weight for each trait on a freshly created pet
pub const BASELINE_WEIGHT: u8 = 25;
pub const MAX_WEIGHT: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    Playful,
    Calm,
    Affectionate,
    Curious,
}

impl PersonalityTrait {
    /// Canonical order; ties for dominant trait go to the earliest entry
    pub const ALL: [PersonalityTrait; 4] = [
        PersonalityTrait::Playful,
        PersonalityTrait::Calm,
        PersonalityTrait::Affectionate,
        PersonalityTrait::Curious,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PersonalityTrait::Playful => "playful",
            PersonalityTrait::Calm => "calm",
            PersonalityTrait::Affectionate => "affectionate",
            PersonalityTrait::Curious => "curious",
        }
    }
}

/// Increment applied to each trait by one care action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitNudge {
    pub playful: u8,
    pub calm: u8,
    pub affectionate: u8,
    pub curious: u8,
}

impl TraitNudge {
    pub const fn new(playful: u8, calm: u8, affectionate: u8, curious: u8) -> Self {
        Self { playful, calm, affectionate, curious }
    }
}

/// Four trait weights
///
/// Missing fields in a degraded record fall back to the baseline split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub playful: u8,
    pub calm: u8,
    pub affectionate: u8,
    pub curious: u8,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            playful: BASELINE_WEIGHT,
            calm: BASELINE_WEIGHT,
            affectionate: BASELINE_WEIGHT,
            curious: BASELINE_WEIGHT,
        }
    }
}

impl Personality {
    pub fn weight(&self, t: PersonalityTrait) -> u8 {
        match t {
            PersonalityTrait::Playful => self.playful,
            PersonalityTrait::Calm => self.calm,
            PersonalityTrait::Affectionate => self.affectionate,
            PersonalityTrait::Curious => self.curious,
        }
    }

    /// Apply a nudge, capping each trait independently
    pub fn nudged(&self, nudge: TraitNudge) -> Self {
        let bump = |w: u8, by: u8| w.saturating_add(by).min(MAX_WEIGHT);
        Self {
            playful: bump(self.playful, nudge.playful),
            calm: bump(self.calm, nudge.calm),
            affectionate: bump(self.affectionate, nudge.affectionate),
            curious: bump(self.curious, nudge.curious),
        }
    }

    /// Highest-weighted trait, first in canonical order on ties
    pub fn dominant(&self) -> PersonalityTrait {
        let mut best = PersonalityTrait::ALL[0];
        for t in PersonalityTrait::ALL.into_iter().skip(1) {
            if self.weight(t) > self.weight(best) {
                best = t;
            }
        }
        best
    }

    pub fn sanitized(&self) -> Self {
        Self {
            playful: self.playful.min(MAX_WEIGHT),
            calm: self.calm.min(MAX_WEIGHT),
            affectionate: self.affectionate.min(MAX_WEIGHT),
            curious: self.curious.min(MAX_WEIGHT),
        }
    }
}
