//! Engine configuration with documented constants
//!
//! All tunables are static data: loaded once (from defaults or a TOML file)
//! and shared read-only as `Arc<PetConfig>`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::care::action::CareActionType;
use crate::core::error::{PetError, Result};
use crate::pet::personality::TraitNudge;
use crate::pet::stage::Stage;
use crate::pet::stats::{DecayRates, StatDelta, STAT_MAX};

/// One value per care action type
///
/// Actions missing from a config file keep their default entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de>, PerAction<T>: Default"))]
pub struct PerAction<T> {
    pub feed: T,
    pub play: T,
    pub walk: T,
    pub pet: T,
    pub groom: T,
}

impl<T> PerAction<T> {
    /// Entries paired with their action, in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (CareActionType, &T)> {
        CareActionType::ALL.into_iter().map(move |action| (action, self.get(action)))
    }

    pub fn get(&self, action: CareActionType) -> &T {
        match action {
            CareActionType::Feed => &self.feed,
            CareActionType::Play => &self.play,
            CareActionType::Walk => &self.walk,
            CareActionType::Pet => &self.pet,
            CareActionType::Groom => &self.groom,
        }
    }
}

impl Default for PerAction<StatDelta> {
    fn default() -> Self {
        Self {
            feed: StatDelta::new(20, 5, 5),
            play: StatDelta::new(-5, 20, -10),
            walk: StatDelta::new(-10, 15, -5),
            pet: StatDelta::new(0, 10, 5),
            groom: StatDelta::new(0, 10, 0),
        }
    }
}

impl Default for PerAction<TraitNudge> {
    fn default() -> Self {
        Self {
            feed: TraitNudge::new(0, 1, 1, 0),
            play: TraitNudge::new(2, 0, 0, 0),
            walk: TraitNudge::new(0, 0, 0, 2),
            pet: TraitNudge::new(0, 0, 2, 0),
            groom: TraitNudge::new(0, 1, 1, 0),
        }
    }
}

/// Consecutive care days needed to leave each stage
///
/// Elder is terminal and has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageRequirements {
    pub egg: u32,
    pub baby: u32,
    pub child: u32,
    pub teen: u32,
    pub adult: u32,
}

impl Default for StageRequirements {
    fn default() -> Self {
        Self {
            egg: 0,
            baby: 3,
            child: 7,
            teen: 14,
            adult: 30,
        }
    }
}

impl StageRequirements {
    /// Days required to advance out of `stage`, `None` for the terminal stage
    pub fn days_to_leave(&self, stage: Stage) -> Option<u32> {
        match stage {
            Stage::Egg => Some(self.egg),
            Stage::Baby => Some(self.baby),
            Stage::Child => Some(self.child),
            Stage::Teen => Some(self.teen),
            Stage::Adult => Some(self.adult),
            Stage::Elder => None,
        }
    }
}

/// Configuration for the pet engine
///
/// These values set the pacing of care. Changing them changes how often
/// partners need to check in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConfig {
    // === STATS ===
    /// Per-hour linear decay for each stat
    ///
    /// At the default hunger rate (4/h) a full pet is starving after about a day.
    pub decay: DecayRates,

    /// Stats below this value are reported as needing attention
    pub attention_threshold: u8,

    // === CARE ===
    /// Per-action-type cooldown in seconds
    ///
    /// Measured from that type's own last use, so feeding does not block play.
    pub cooldown_secs: i64,

    /// Experience granted per applied care action
    pub experience_per_action: u64,

    /// Stat effect of each care action
    pub effects: PerAction<StatDelta>,

    /// Personality drift from each care action
    pub nudges: PerAction<TraitNudge>,

    // === EVOLUTION ===
    pub stages: StageRequirements,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            decay: DecayRates::default(),
            attention_threshold: 30,
            cooldown_secs: 300,
            experience_per_action: 10,
            effects: PerAction::<StatDelta>::default(),
            nudges: PerAction::<TraitNudge>::default(),
            stages: StageRequirements::default(),
        }
    }
}

impl PetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs)
    }

    /// Parse from TOML; missing sections keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded pet config from {}", path.display());
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let d = &self.decay;
        let rates = [d.hunger_per_hour, d.happiness_per_hour, d.energy_per_hour];
        if rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(PetError::Config("decay rates must be positive and finite".into()));
        }

        // Hunger fastest, energy slowest
        if d.hunger_per_hour < d.happiness_per_hour || d.happiness_per_hour < d.energy_per_hour {
            return Err(PetError::Config(format!(
                "decay rates must satisfy hunger ({}) >= happiness ({}) >= energy ({})",
                d.hunger_per_hour, d.happiness_per_hour, d.energy_per_hour
            )));
        }

        if self.cooldown_secs < 0 {
            return Err(PetError::Config("cooldown_secs must not be negative".into()));
        }

        if self.attention_threshold > 100 {
            return Err(PetError::Config(format!(
                "attention_threshold ({}) must be within 0..=100",
                self.attention_threshold
            )));
        }

        // A single action may move a stat across its whole range, no further
        let max = STAT_MAX as i32;
        for (action, delta) in self.effects.iter() {
            let parts = [delta.hunger, delta.happiness, delta.energy];
            if parts.iter().any(|v| !(-max..=max).contains(v)) {
                return Err(PetError::Config(format!(
                    "{} effect {:?} must stay within -{max}..={max}",
                    action, delta
                )));
            }
        }

        let s = &self.stages;
        let days = [s.egg, s.baby, s.child, s.teen, s.adult];
        if days.windows(2).any(|w| w[0] > w[1]) {
            return Err(PetError::Config(format!(
                "stage requirements must be non-decreasing, got {:?}",
                days
            )));
        }

        Ok(())
    }
}
