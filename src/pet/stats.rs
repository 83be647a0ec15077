//! Clamped pet stats and time-based decay
//!
//! Every stat lives in `[0, 100]`. Decay is a pure function of elapsed
//! wall-clock hours, so two devices projecting from the same `last_care_at`
//! land on the same numbers no matter when each last rendered.

use serde::{Deserialize, Serialize};

pub const STAT_MIN: u8 = 0;
pub const STAT_MAX: u8 = 100;

/// Clamp any signed intermediate into the stat range
pub fn clamp(value: i32) -> u8 {
    value.clamp(STAT_MIN as i32, STAT_MAX as i32) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Hunger,
    Happiness,
    Energy,
}

impl StatKind {
    pub const ALL: [StatKind; 3] = [StatKind::Hunger, StatKind::Happiness, StatKind::Energy];

    pub fn name(&self) -> &'static str {
        match self {
            StatKind::Hunger => "hunger",
            StatKind::Happiness => "happiness",
            StatKind::Energy => "energy",
        }
    }
}

/// Linear per-hour decay rates
///
/// Hunger drops fastest and energy slowest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayRates {
    pub hunger_per_hour: f64,
    pub happiness_per_hour: f64,
    pub energy_per_hour: f64,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            hunger_per_hour: 4.0,
            happiness_per_hour: 3.0,
            energy_per_hour: 2.0,
        }
    }
}

impl DecayRates {
    pub fn rate(&self, stat: StatKind) -> f64 {
        match stat {
            StatKind::Hunger => self.hunger_per_hour,
            StatKind::Happiness => self.happiness_per_hour,
            StatKind::Energy => self.energy_per_hour,
        }
    }
}

/// Decay delta for one stat after `hours_elapsed`
///
/// Always `<= 0`. Partial points are truncated, and the magnitude never
/// exceeds the full stat range, even for unbounded neglect.
pub fn decay(stat: StatKind, hours_elapsed: f64, rates: &DecayRates) -> i32 {
    let amount = rates.rate(stat) * hours_elapsed;
    if amount.is_nan() || amount <= 0.0 {
        return 0;
    }
    -(amount.floor().min(STAT_MAX as f64) as i32)
}

/// Signed change to the three stats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatDelta {
    pub hunger: i32,
    pub happiness: i32,
    pub energy: i32,
}

impl StatDelta {
    pub const fn new(hunger: i32, happiness: i32, energy: i32) -> Self {
        Self { hunger, happiness, energy }
    }
}

/// Hunger (fullness), happiness and energy; higher is better for all three
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hunger: u8,
    pub happiness: u8,
    pub energy: u8,
}

impl Default for Stats {
    fn default() -> Self {
        Self::uniform(80)
    }
}

impl Stats {
    pub fn new(hunger: u8, happiness: u8, energy: u8) -> Self {
        Self { hunger, happiness, energy }.sanitized()
    }

    pub fn uniform(value: u8) -> Self {
        Self::new(value, value, value)
    }

    pub fn get(&self, stat: StatKind) -> u8 {
        match stat {
            StatKind::Hunger => self.hunger,
            StatKind::Happiness => self.happiness,
            StatKind::Energy => self.energy,
        }
    }

    /// Add a signed delta, clamping each stat
    pub fn apply(&self, delta: StatDelta) -> Self {
        Self {
            hunger: clamp((self.hunger as i32).saturating_add(delta.hunger)),
            happiness: clamp((self.happiness as i32).saturating_add(delta.happiness)),
            energy: clamp((self.energy as i32).saturating_add(delta.energy)),
        }
    }

    /// Stats after `hours_elapsed` of neglect
    pub fn decayed(&self, hours_elapsed: f64, rates: &DecayRates) -> Self {
        self.apply(StatDelta {
            hunger: decay(StatKind::Hunger, hours_elapsed, rates),
            happiness: decay(StatKind::Happiness, hours_elapsed, rates),
            energy: decay(StatKind::Energy, hours_elapsed, rates),
        })
    }

    /// Pull out-of-range values from degraded records back into range
    pub fn sanitized(&self) -> Self {
        Self {
            hunger: self.hunger.min(STAT_MAX),
            happiness: self.happiness.min(STAT_MAX),
            energy: self.energy.min(STAT_MAX),
        }
    }

    pub fn average(&self) -> f32 {
        (self.hunger as f32 + self.happiness as f32 + self.energy as f32) / 3.0
    }

    /// Stats strictly below `threshold`, in canonical order
    pub fn below(&self, threshold: u8) -> Vec<StatKind> {
        StatKind::ALL
            .into_iter()
            .filter(|s| self.get(*s) < threshold)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp(-5), 0);
        assert_eq!(clamp(0), 0);
        assert_eq!(clamp(55), 55);
        assert_eq!(clamp(100), 100);
        assert_eq!(clamp(250), 100);
    }

    #[test]
    fn test_decay_rates_ordered() {
        let rates = DecayRates::default();
        // hunger > happiness > energy
        assert!(rates.hunger_per_hour > rates.happiness_per_hour);
        assert!(rates.happiness_per_hour > rates.energy_per_hour);
    }

    #[test]
    fn test_decay_is_non_positive() {
        let rates = DecayRates::default();
        assert_eq!(decay(StatKind::Hunger, 0.0, &rates), 0);
        assert_eq!(decay(StatKind::Hunger, -3.0, &rates), 0);
        assert_eq!(decay(StatKind::Hunger, 10.0, &rates), -40);
        assert_eq!(decay(StatKind::Energy, 10.0, &rates), -20);
        // Partial points truncate
        assert_eq!(decay(StatKind::Happiness, 0.5, &rates), -1);
    }

    #[test]
    fn test_decay_magnitude_capped() {
        let rates = DecayRates::default();
        assert_eq!(decay(StatKind::Hunger, 1.0e9, &rates), -100);
        assert_eq!(decay(StatKind::Hunger, f64::INFINITY, &rates), -100);
        assert_eq!(decay(StatKind::Hunger, f64::NAN, &rates), 0);
        assert_eq!(decay(StatKind::Hunger, f64::NEG_INFINITY, &rates), 0);
    }

    #[test]
    fn test_decayed_never_negative() {
        let stats = Stats::uniform(10);
        let decayed = stats.decayed(48.0, &DecayRates::default());
        assert_eq!(decayed, Stats::uniform(0));
    }

    #[test]
    fn test_apply_clamps_high() {
        let stats = Stats::new(95, 50, 99);
        let after = stats.apply(StatDelta::new(20, 5, 5));
        assert_eq!(after, Stats::new(100, 55, 100));
    }

    #[test]
    fn test_apply_extreme_delta_saturates() {
        let stats = Stats::new(90, 10, 50);
        let after = stats.apply(StatDelta::new(i32::MAX, i32::MIN, 0));
        assert_eq!(after, Stats::new(100, 0, 50));
    }

    #[test]
    fn test_sanitized() {
        let raw = Stats { hunger: 180, happiness: 40, energy: 101 };
        assert_eq!(raw.sanitized(), Stats::new(100, 40, 100));
    }

    #[test]
    fn test_below_threshold() {
        let stats = Stats::new(20, 70, 10);
        assert_eq!(stats.below(30), vec![StatKind::Hunger, StatKind::Energy]);
    }
}
