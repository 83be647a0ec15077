//! Stage evolution gated on care streaks
//!
//! A pet advances exactly one stage at a time, even when its streak already
//! covers a later stage's requirement. Evolution requests carry the stage
//! they were computed against; a request for a stage the pet has already
//! left is a no-op, since duplicate event delivery makes that routine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::PetConfig;
use crate::lifecycle::milestone::Milestone;
use crate::lifecycle::streak::CareStreakInfo;
use crate::pet::stage::Stage;
use crate::pet::Pet;

/// Static requirement for leaving one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionRequirement {
    pub stage: Stage,
    pub required_days: u32,
    pub next: Option<Stage>,
}

pub fn requirement(stage: Stage, config: &PetConfig) -> EvolutionRequirement {
    EvolutionRequirement {
        stage,
        required_days: config.stages.days_to_leave(stage).unwrap_or(0),
        next: stage.next(),
    }
}

/// Requirement table for every stage, in stage order
pub fn requirements(config: &PetConfig) -> Vec<EvolutionRequirement> {
    Stage::ALL.iter().map(|s| requirement(*s, config)).collect()
}

/// How close a pet is to its next stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionProgress {
    pub required_days: u32,
    pub current_days: u32,
    /// 0..=100
    pub progress_percent: u8,
    pub is_eligible: bool,
}

pub fn eligibility(pet: &Pet, streak: &CareStreakInfo, config: &PetConfig) -> EvolutionProgress {
    let req = requirement(pet.stage, config);
    let current_days = streak.current_streak;

    if req.next.is_none() {
        return EvolutionProgress {
            required_days: req.required_days,
            current_days,
            progress_percent: 100,
            is_eligible: false,
        };
    }

    let progress_percent = if req.required_days == 0 {
        100
    } else {
        ((current_days as u64 * 100) / req.required_days as u64).min(100) as u8
    };

    EvolutionProgress {
        required_days: req.required_days,
        current_days,
        progress_percent,
        is_eligible: current_days >= req.required_days,
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvolutionError {
    #[error("{stage} needs a {required_days}-day streak, have {current_days}")]
    Ineligible {
        stage: Stage,
        required_days: u32,
        current_days: u32,
    },

    #[error("Elder is the final stage")]
    Terminal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvolutionOutcome {
    /// Advanced one stage; exactly one milestone is produced
    Evolved {
        from: Stage,
        to: Stage,
        milestone: Milestone,
    },
    /// The pet already left `requested_from`; nothing changed
    AlreadyApplied { requested_from: Stage, current: Stage },
}

/// Advance `pet` one stage if the request is still current and eligible
///
/// `requested_from` is the stage the caller saw when deciding to evolve.
/// Rejections leave the pet unchanged.
pub fn evolve(
    pet: &mut Pet,
    requested_from: Stage,
    streak: &CareStreakInfo,
    now: DateTime<Utc>,
    config: &PetConfig,
) -> Result<EvolutionOutcome, EvolutionError> {
    if pet.stage > requested_from {
        tracing::debug!(
            pet = %pet.id,
            requested = %requested_from,
            current = %pet.stage,
            "duplicate evolution ignored"
        );
        return Ok(EvolutionOutcome::AlreadyApplied {
            requested_from,
            current: pet.stage,
        });
    }

    let from = pet.stage;
    let Some(to) = from.next() else {
        return Err(EvolutionError::Terminal);
    };

    let progress = eligibility(pet, streak, config);
    if !progress.is_eligible {
        return Err(EvolutionError::Ineligible {
            stage: from,
            required_days: progress.required_days,
            current_days: progress.current_days,
        });
    }

    pet.raise_stage(to);
    tracing::info!(pet = %pet.id, %from, %to, "pet evolved");

    Ok(EvolutionOutcome::Evolved {
        from,
        to,
        milestone: Milestone::for_stage(pet.couple_id, to, now),
    })
}
