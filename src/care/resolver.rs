//! Care resolution: validation, effects and cooldowns
//!
//! The same checks run on the local device and at the remote authority
//! (see `sync::memory`), so a client cannot skip a cooldown by only
//! checking locally.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::care::action::{CareAction, CareActionType};
use crate::care::log::CareLog;
use crate::core::config::PetConfig;
use crate::core::types::PartnerId;
use crate::pet::stage::Stage;
use crate::pet::Pet;

/// Validation rejection; no state changes and no record is emitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CareRejection {
    #[error("care is unavailable before the egg hatches (stage {stage})")]
    PreHatch { stage: Stage },

    #[error("{action} is cooling down for another {remaining_secs}s")]
    CooldownActive {
        action: CareActionType,
        remaining_secs: i64,
    },
}

/// Check whether `action_type` may be performed now
///
/// `last_of_type` is the most recent action of the same type; cooldowns are
/// per type, not global.
pub fn check(
    pet: &Pet,
    action_type: CareActionType,
    last_of_type: Option<&CareAction>,
    now: DateTime<Utc>,
    config: &PetConfig,
) -> Result<(), CareRejection> {
    if !pet.stage.accepts_care() {
        return Err(CareRejection::PreHatch { stage: pet.stage });
    }

    match last_of_type {
        Some(last) => cooldown_check(action_type, now - last.performed_at, config),
        None => Ok(()),
    }
}

/// Like [`check`], but against the nearest same-type entry in `log`
///
/// Entries on either side of `at` count, so an action that arrives late
/// (a partner coming back online) is checked against its real neighbours.
/// The remote authority uses this to validate incoming records.
pub fn check_against_log(
    pet: &Pet,
    action_type: CareActionType,
    log: &CareLog,
    at: DateTime<Utc>,
    config: &PetConfig,
) -> Result<(), CareRejection> {
    if !pet.stage.accepts_care() {
        return Err(CareRejection::PreHatch { stage: pet.stage });
    }

    let nearest_gap = log
        .iter()
        .filter(|a| a.pet_id == pet.id && a.action_type == action_type)
        .map(|a| {
            let gap = at - a.performed_at;
            if gap < Duration::zero() {
                -gap
            } else {
                gap
            }
        })
        .min();

    match nearest_gap {
        Some(gap) => cooldown_check(action_type, gap, config),
        None => Ok(()),
    }
}

fn cooldown_check(action_type: CareActionType, since: Duration, config: &PetConfig) -> Result<(), CareRejection> {
    let cooldown = config.cooldown();
    if since < cooldown {
        return Err(CareRejection::CooldownActive {
            action: action_type,
            remaining_secs: (cooldown - since).num_seconds().max(1),
        });
    }
    Ok(())
}

pub fn can_perform(
    pet: &Pet,
    action_type: CareActionType,
    last_of_type: Option<&CareAction>,
    now: DateTime<Utc>,
    config: &PetConfig,
) -> bool {
    check(pet, action_type, last_of_type, now, config).is_ok()
}

/// Apply the effect of one care action at `at`, without validation
///
/// Decay since the last reference is materialized first, then the effect
/// table delta, the experience reward and the personality nudge. Shared by
/// live care and log replay so both produce the same projection.
pub fn apply_effects(pet: &Pet, action_type: CareActionType, at: DateTime<Utc>, config: &PetConfig) -> Pet {
    let mut next = pet.clone();
    next.stats = pet
        .current_stats(at, config)
        .apply(*config.effects.get(action_type));
    next.experience = pet.experience.saturating_add(config.experience_per_action);
    next.personality = pet.personality.nudged(*config.nudges.get(action_type));
    next.last_care_at = Some(match pet.last_care_at {
        Some(prev) if prev > at => prev,
        _ => at,
    });
    next
}

/// Validate and apply a care action, producing the new pet and its record
pub fn apply(
    pet: &Pet,
    actor: PartnerId,
    action_type: CareActionType,
    last_of_type: Option<&CareAction>,
    now: DateTime<Utc>,
    config: &PetConfig,
) -> Result<(Pet, CareAction), CareRejection> {
    check(pet, action_type, last_of_type, now, config)?;
    let next = apply_effects(pet, action_type, now, config);
    let record = CareAction::new(pet.id, actor, action_type, now);
    Ok((next, record))
}

/// Validate against the log, then mutate `pet` and append the record
///
/// On rejection neither `pet` nor `log` is touched.
pub fn perform(
    pet: &mut Pet,
    log: &mut CareLog,
    actor: PartnerId,
    action_type: CareActionType,
    now: DateTime<Utc>,
    config: &PetConfig,
) -> Result<CareAction, CareRejection> {
    if let Err(rejection) = check_against_log(pet, action_type, log, now, config) {
        tracing::debug!(pet = %pet.id, action = %action_type, "care rejected: {}", rejection);
        return Err(rejection);
    }

    let record = CareAction::new(pet.id, actor, action_type, now);
    *pet = apply_effects(pet, action_type, now, config);
    log.append(record.clone());
    tracing::debug!(
        pet = %pet.id,
        actor = %actor,
        action = %action_type,
        dominant = pet.dominant_trait().name(),
        "care applied"
    );
    Ok(record)
}
