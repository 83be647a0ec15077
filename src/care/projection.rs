//! Replay of the care log into a pet projection
//!
//! Stats, personality, experience and `last_care_at` are all recomputable
//! from the pet's birth stats plus its care log. Sync prefers this over
//! merging two stat snapshots, so whichever device holds the union of both
//! partners' logs arrives at the same projection.

use crate::care::log::CareLog;
use crate::care::resolver::apply_effects;
use crate::core::config::PetConfig;
use crate::pet::personality::Personality;
use crate::pet::Pet;

/// Rebuild `pet`'s projection from its birth stats and `log`
///
/// Identity, stage and species are kept; entries for other pets are ignored.
/// Cooldowns are not re-checked, logged entries were already accepted.
pub fn replay(pet: &Pet, log: &CareLog, config: &PetConfig) -> Pet {
    let mut base = pet.clone();
    base.stats = pet.birth_stats;
    base.personality = Personality::default();
    base.experience = 0;
    base.last_care_at = None;
    replay_since(&base, pet, log, config)
}

/// Rebuild `pet`'s projection on top of a known snapshot
///
/// `base` already accounts for every action up to its `last_care_at`; only
/// later entries are applied. Used when the log no longer reaches back to
/// the pet's birth.
pub fn replay_since(base: &Pet, pet: &Pet, log: &CareLog, config: &PetConfig) -> Pet {
    let mut start = pet.clone();
    start.stats = base.stats;
    start.personality = base.personality;
    start.experience = base.experience;
    start.last_care_at = base.last_care_at;

    log.iter()
        .filter(|a| a.pet_id == pet.id && Some(a.performed_at) > base.last_care_at)
        .fold(start, |acc, action| {
            apply_effects(&acc, action.action_type, action.performed_at, config)
        })
}
