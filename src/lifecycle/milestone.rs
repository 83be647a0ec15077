//! One-time achievements for a couple
//!
//! Rules are a static ordered list of pure predicates. A milestone's title
//! is its dedup key within a couple, so evaluating the rules again after
//! every care action (or on a duplicated event) never unlocks twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::care::action::CareActionType;
use crate::care::log::CareLog;
use crate::core::types::{CoupleId, MilestoneId};
use crate::lifecycle::streak::{self, CareStreakInfo};
use crate::pet::stage::Stage;
use crate::pet::Pet;

/// Unlocked achievement record; create-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub couple_id: CoupleId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub achieved_at: DateTime<Utc>,
}

impl Milestone {
    pub fn new(
        couple_id: CoupleId,
        title: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
        achieved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MilestoneId::new(),
            couple_id,
            title: title.into(),
            description: description.into(),
            icon: icon.into(),
            achieved_at,
        }
    }

    fn from_rule(couple_id: CoupleId, rule: &MilestoneRule, achieved_at: DateTime<Utc>) -> Self {
        Self::new(couple_id, rule.title, rule.description, rule.icon, achieved_at)
    }

    /// Milestone recorded when a pet reaches `stage`
    pub fn for_stage(couple_id: CoupleId, stage: Stage, achieved_at: DateTime<Utc>) -> Self {
        match RULES.iter().find(|r| r.title == stage_title(stage)) {
            Some(rule) => Self::from_rule(couple_id, rule, achieved_at),
            None => Self::new(couple_id, stage_title(stage), "", "sparkles", achieved_at),
        }
    }
}

/// Title of the milestone for reaching `stage`
pub fn stage_title(stage: Stage) -> &'static str {
    match stage {
        Stage::Egg => "A New Egg",
        Stage::Baby => "Hatched",
        Stage::Child => "Growing Up",
        Stage::Teen => "Teenage Years",
        Stage::Adult => "All Grown Up",
        Stage::Elder => "Wise Elder",
    }
}

/// Relationship-level facts some rules look at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipContext {
    pub days_together: u32,
}

/// Everything a rule predicate may inspect
pub struct RuleInput<'a> {
    pub pet: &'a Pet,
    pub log: &'a CareLog,
    pub streak: &'a CareStreakInfo,
    pub relationship: Option<&'a RelationshipContext>,
}

pub struct MilestoneRule {
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub check: fn(&RuleInput) -> bool,
}

fn reached(input: &RuleInput, stage: Stage) -> bool {
    input.pet.stage >= stage
}

fn days_together(input: &RuleInput) -> u32 {
    input.relationship.map(|r| r.days_together).unwrap_or(0)
}

/// Ordered rule list
pub static RULES: &[MilestoneRule] = &[
    MilestoneRule {
        title: "First Care",
        description: "Cared for your pet for the first time",
        icon: "paw",
        check: |i| !i.log.is_empty(),
    },
    MilestoneRule {
        title: "Teamwork",
        description: "Both partners have cared for the pet",
        icon: "handshake",
        check: |i| i.log.actors().len() >= 2,
    },
    MilestoneRule {
        title: "Well Rounded",
        description: "Tried every kind of care",
        icon: "star",
        check: |i| i.log.action_types().len() == CareActionType::ALL.len(),
    },
    MilestoneRule {
        title: "Three Day Streak",
        description: "Cared for your pet three days in a row",
        icon: "flame",
        check: |i| i.streak.longest_streak >= 3,
    },
    MilestoneRule {
        title: "Week of Love",
        description: "Cared for your pet seven days in a row",
        icon: "heart",
        check: |i| i.streak.longest_streak >= 7,
    },
    MilestoneRule {
        title: "Fortnight Devotion",
        description: "Cared for your pet fourteen days in a row",
        icon: "medal",
        check: |i| i.streak.longest_streak >= 14,
    },
    MilestoneRule {
        title: "Monthly Devotion",
        description: "Cared for your pet thirty days in a row",
        icon: "trophy",
        check: |i| i.streak.longest_streak >= 30,
    },
    MilestoneRule {
        title: "Hundred Cares",
        description: "Gave one hundred care actions together",
        icon: "gift",
        check: |i| i.log.len() >= 100,
    },
    MilestoneRule {
        title: "Perfect Health",
        description: "All stats at 90 or above right after a care action",
        icon: "sparkles",
        // Stored projection, i.e. stats as of the last care, not decayed to now
        check: |i| {
            let s = i.pet.stats;
            s.hunger >= 90 && s.happiness >= 90 && s.energy >= 90
        },
    },
    MilestoneRule {
        title: "Hatched",
        description: "Your egg hatched",
        icon: "egg",
        check: |i| reached(i, Stage::Baby),
    },
    MilestoneRule {
        title: "Growing Up",
        description: "Your pet became a child",
        icon: "sprout",
        check: |i| reached(i, Stage::Child),
    },
    MilestoneRule {
        title: "Teenage Years",
        description: "Your pet became a teen",
        icon: "bolt",
        check: |i| reached(i, Stage::Teen),
    },
    MilestoneRule {
        title: "All Grown Up",
        description: "Your pet became an adult",
        icon: "crown",
        check: |i| reached(i, Stage::Adult),
    },
    MilestoneRule {
        title: "Wise Elder",
        description: "Your pet became an elder",
        icon: "owl",
        check: |i| reached(i, Stage::Elder),
    },
    MilestoneRule {
        title: "One Month Together",
        description: "Thirty days as a couple",
        icon: "calendar",
        check: |i| days_together(i) >= 30,
    },
    MilestoneRule {
        title: "One Year Together",
        description: "A whole year as a couple",
        icon: "ring",
        check: |i| days_together(i) >= 365,
    },
];

/// A couple's unlocked milestones, keyed by title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneBook {
    couple_id: CoupleId,
    milestones: Vec<Milestone>,
}

impl MilestoneBook {
    pub fn new(couple_id: CoupleId) -> Self {
        Self {
            couple_id,
            milestones: Vec::new(),
        }
    }

    pub fn couple_id(&self) -> CoupleId {
        self.couple_id
    }

    pub fn contains(&self, title: &str) -> bool {
        self.milestones.iter().any(|m| m.title == title)
    }

    pub fn get(&self, title: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.title == title)
    }

    /// Record a milestone; false if the title exists or it belongs to another couple
    pub fn insert(&mut self, milestone: Milestone) -> bool {
        if milestone.couple_id != self.couple_id || self.contains(&milestone.title) {
            return false;
        }
        self.milestones.push(milestone);
        true
    }

    /// Union with remote records; returns how many were new
    pub fn merge<I>(&mut self, milestones: I) -> usize
    where
        I: IntoIterator<Item = Milestone>,
    {
        milestones.into_iter().filter(|m| self.insert(m.clone())).count()
    }

    /// Drop an unlock that was never confirmed remotely
    pub(crate) fn remove(&mut self, id: MilestoneId) -> Option<Milestone> {
        let pos = self.milestones.iter().position(|m| m.id == id)?;
        Some(self.milestones.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter()
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.milestones.iter().map(|m| m.title.as_str()).collect()
    }
}

/// Unlock every rule that newly holds; returns only the new milestones
///
/// Safe to call redundantly: titles already in `book` are skipped before
/// their predicate is even evaluated.
pub fn check_and_create(
    book: &mut MilestoneBook,
    pet: &Pet,
    log: &CareLog,
    relationship: Option<&RelationshipContext>,
    now: DateTime<Utc>,
) -> Vec<Milestone> {
    let streak = streak::from_log(log, now);
    let input = RuleInput {
        pet,
        log,
        streak: &streak,
        relationship,
    };

    let mut unlocked = Vec::new();
    for rule in RULES {
        if book.contains(rule.title) || !(rule.check)(&input) {
            continue;
        }
        let milestone = Milestone::from_rule(book.couple_id, rule, now);
        if book.insert(milestone.clone()) {
            tracing::info!(couple = %book.couple_id, title = rule.title, "milestone unlocked");
            unlocked.push(milestone);
        }
    }
    unlocked
}

/// Completed rules out of the full rule list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    pub completed: usize,
    pub total: usize,
}

impl MilestoneProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

pub fn progress(book: &MilestoneBook) -> MilestoneProgress {
    MilestoneProgress {
        completed: RULES.iter().filter(|r| book.contains(r.title)).count(),
        total: RULES.len(),
    }
}
