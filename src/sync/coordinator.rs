//! Sync coordinator: optimistic local care reconciled with the remote authority
//!
//! Each partner's device owns one coordinator around its local [`PetState`].
//! Care is applied locally first and then written through an [`Outbox`].
//! Transient failures keep the local state and leave the writes queued;
//! a permanent rejection of a care action retracts it and re-projects.
//!
//! Incoming remote events merge into the care log by id and then rerun the
//! derived pipeline (projection, streak, eligibility, milestones). Derived
//! state always comes from replaying the merged log, never from combining two
//! stat snapshots, so both partners converge once they have seen the same log.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::care::action::{CareAction, CareActionType};
use crate::care::log::CareLog;
use crate::care::projection;
use crate::care::resolver::{self, CareRejection};
use crate::core::clock::Clock;
use crate::core::config::PetConfig;
use crate::core::types::{CareActionId, PartnerId, PetId};
use crate::lifecycle::evolution::{self, EvolutionError, EvolutionOutcome, EvolutionProgress};
use crate::lifecycle::milestone::{self, Milestone, MilestoneBook, RelationshipContext};
use crate::lifecycle::streak::{self, CareStreakInfo};
use crate::pet::stage::Stage;
use crate::pet::stats::Stats;
use crate::pet::Pet;
use crate::sync::events::RemoteEvent;
use crate::sync::outbox::{Outbox, PendingOp};
use crate::sync::remote::{RemoteError, RemoteStore, StatsUpdate};

/// Care actions fetched by the first history request of a pull
pub const HISTORY_LIMIT: usize = 5_000;

/// Largest history window a pull grows to before giving up on the full log
pub const HISTORY_MAX: usize = 80_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Validation rejection; nothing changed
    #[error("care rejected: {0}")]
    Rejected(#[from] CareRejection),

    #[error("evolution rejected: {0}")]
    Evolution(#[from] EvolutionError),

    /// The remote authority refused an optimistic action, which was retracted
    #[error("remote rejected care action {action}: {source}")]
    RemoteRejected {
        action: CareActionId,
        source: RemoteError,
    },

    /// A remote call needed to proceed failed
    #[error("remote call failed: {0}")]
    Remote(RemoteError),
}

impl SyncError {
    /// Worth retrying automatically
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_transient())
    }
}

/// Local owned state for one pet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetState {
    pub pet: Pet,
    pub log: CareLog,
    pub milestones: MilestoneBook,
}

impl PetState {
    pub fn new(pet: Pet) -> Self {
        let milestones = MilestoneBook::new(pet.couple_id);
        Self {
            pet,
            log: CareLog::new(),
            milestones,
        }
    }
}

/// Result of a locally applied care action
#[derive(Debug, Clone)]
pub struct CareReceipt {
    pub action: CareAction,
    pub unlocked: Vec<Milestone>,
    pub progress: EvolutionProgress,
    /// Set when the remote write failed transiently; the action stays queued
    pub remote_error: Option<RemoteError>,
}

impl CareReceipt {
    pub fn is_synced(&self) -> bool {
        self.remote_error.is_none()
    }
}

/// Result of an evolution request
#[derive(Debug, Clone)]
pub struct EvolutionReceipt {
    pub outcome: EvolutionOutcome,
    pub remote_error: Option<RemoteError>,
}

/// What a merge or resync changed
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub merged_actions: usize,
    pub merged_milestones: usize,
    pub stage_changed: bool,
    pub unlocked: Vec<Milestone>,
    /// Events addressed to a different pet
    pub ignored_events: usize,
    pub remote_error: Option<RemoteError>,
}

impl SyncReport {
    fn absorb(&mut self, other: SyncReport) {
        self.merged_actions += other.merged_actions;
        self.merged_milestones += other.merged_milestones;
        self.stage_changed |= other.stage_changed;
        self.unlocked.extend(other.unlocked);
        self.ignored_events += other.ignored_events;
        if other.remote_error.is_some() {
            self.remote_error = other.remote_error;
        }
    }
}

/// Outcome of pushing the outbox
#[derive(Debug, Clone, Default)]
pub struct FlushReport {
    pub sent: usize,
    /// Writes the remote permanently refused
    pub rejected: Vec<(PendingOp, RemoteError)>,
    /// Transient failure that stopped the flush
    pub stalled: Option<RemoteError>,
}

pub struct SyncCoordinator {
    partner: PartnerId,
    state: PetState,
    remote: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    config: Arc<PetConfig>,
    outbox: Outbox,
    relationship: Option<RelationshipContext>,
    history_page: usize,
    history_max: usize,
    /// Remote snapshot replay starts from once the log no longer reaches birth
    replay_base: Option<Pet>,
}

impl SyncCoordinator {
    /// Wrap existing local state
    pub fn new(
        partner: PartnerId,
        state: PetState,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
        config: Arc<PetConfig>,
    ) -> Self {
        Self {
            partner,
            state,
            remote,
            clock,
            config,
            outbox: Outbox::new(),
            relationship: None,
            history_page: HISTORY_LIMIT,
            history_max: HISTORY_MAX,
            replay_base: None,
        }
    }

    /// Register a brand new pet remotely and start coordinating it
    pub async fn create(
        partner: PartnerId,
        pet: Pet,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
        config: Arc<PetConfig>,
    ) -> Result<Self, SyncError> {
        remote.create_pet(&pet).await.map_err(SyncError::Remote)?;
        tracing::info!(pet = %pet.id, couple = %pet.couple_id, "pet created");
        Ok(Self::new(partner, PetState::new(pet), remote, clock, config))
    }

    /// Load an existing pet from the remote store
    pub async fn connect(
        partner: PartnerId,
        pet_id: PetId,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
        config: Arc<PetConfig>,
    ) -> Result<Self, SyncError> {
        let pet = remote.get_pet(pet_id).await.map_err(SyncError::Remote)?.sanitized();
        let mut coordinator = Self::new(partner, PetState::new(pet), remote, clock, config);
        coordinator.pull().await.map_err(SyncError::Remote)?;
        if let Some(e) = coordinator.flush().await.stalled {
            tracing::warn!("queued writes after connect: {}", e);
        }
        Ok(coordinator)
    }

    pub fn with_relationship(mut self, relationship: RelationshipContext) -> Self {
        self.relationship = Some(relationship);
        self
    }

    pub fn set_relationship(&mut self, relationship: RelationshipContext) {
        self.relationship = Some(relationship);
    }

    /// Size of the first history request and the most a pull will fetch
    pub fn set_history_window(&mut self, page: usize, max: usize) {
        self.history_page = page.max(1);
        self.history_max = max.max(self.history_page);
    }

    /// Whether the local log reaches back to the pet's birth
    pub fn has_full_history(&self) -> bool {
        self.replay_base.is_none()
    }

    pub fn partner(&self) -> PartnerId {
        self.partner
    }

    pub fn state(&self) -> &PetState {
        &self.state
    }

    pub fn pet(&self) -> &Pet {
        &self.state.pet
    }

    pub fn log(&self) -> &CareLog {
        &self.state.log
    }

    pub fn milestones(&self) -> &MilestoneBook {
        &self.state.milestones
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn config(&self) -> &PetConfig {
        &self.config
    }

    /// Stats with decay applied up to now
    pub fn current_stats(&self) -> Stats {
        self.state.pet.current_stats(self.clock.now(), &self.config)
    }

    pub fn streak(&self) -> CareStreakInfo {
        streak::from_log(&self.state.log, self.clock.now())
    }

    pub fn eligibility(&self) -> EvolutionProgress {
        evolution::eligibility(&self.state.pet, &self.streak(), &self.config)
    }

    pub fn milestone_progress(&self) -> milestone::MilestoneProgress {
        milestone::progress(&self.state.milestones)
    }

    pub fn can_perform(&self, action_type: CareActionType) -> bool {
        resolver::check_against_log(
            &self.state.pet,
            action_type,
            &self.state.log,
            self.clock.now(),
            &self.config,
        )
        .is_ok()
    }

    /// Apply care locally, then write it through to the remote
    ///
    /// Validation rejections return `SyncError::Rejected` with no state
    /// change. A transient remote failure still returns `Ok`, with the
    /// failure in the receipt and the writes queued in the outbox.
    pub async fn perform_care(&mut self, action_type: CareActionType) -> Result<CareReceipt, SyncError> {
        let now = self.clock.now();
        let action = resolver::perform(
            &mut self.state.pet,
            &mut self.state.log,
            self.partner,
            action_type,
            now,
            &self.config,
        )?;

        self.outbox.push(PendingOp::AppendCareAction {
            action: action.clone(),
        });
        self.queue_stats();
        let unlocked = self.unlock_milestones();

        let flush = self.flush().await;
        if let Some((_, source)) = flush.rejected.iter().find(|(op, _)| {
            matches!(op, PendingOp::AppendCareAction { action: a } if a.id == action.id)
        }) {
            return Err(SyncError::RemoteRejected {
                action: action.id,
                source: source.clone(),
            });
        }

        Ok(CareReceipt {
            action,
            unlocked,
            progress: self.eligibility(),
            remote_error: flush.stalled,
        })
    }

    /// Evolve one stage from the current stage
    pub async fn evolve(&mut self) -> Result<EvolutionReceipt, SyncError> {
        let from = self.state.pet.stage;
        self.evolve_from(from).await
    }

    /// Evolve one stage, as decided against `requested_from`
    ///
    /// A request for a stage the pet has already left is a no-op.
    pub async fn evolve_from(&mut self, requested_from: Stage) -> Result<EvolutionReceipt, SyncError> {
        let now = self.clock.now();
        let streak = streak::from_log(&self.state.log, now);
        let outcome = evolution::evolve(&mut self.state.pet, requested_from, &streak, now, &self.config)?;

        let EvolutionOutcome::Evolved { to, milestone, .. } = outcome.clone() else {
            return Ok(EvolutionReceipt {
                outcome,
                remote_error: None,
            });
        };

        self.outbox.push(PendingOp::UpdateStage {
            pet_id: self.state.pet.id,
            stage: to,
        });
        // Title may already be unlocked if the stage rule fired first
        if self.state.milestones.insert(milestone.clone()) {
            self.outbox.push(PendingOp::CreateMilestone { milestone });
        }

        let flush = self.flush().await;
        Ok(EvolutionReceipt {
            outcome,
            remote_error: flush.stalled,
        })
    }

    /// Merge one realtime notification
    pub async fn handle_remote_event(&mut self, event: RemoteEvent) -> SyncReport {
        if event.pet_id() != self.state.pet.id {
            tracing::debug!(pet = %event.pet_id(), "ignoring event for another pet");
            return SyncReport {
                ignored_events: 1,
                ..SyncReport::default()
            };
        }

        let mut report = SyncReport::default();
        match event {
            RemoteEvent::CareActionInserted { action } => {
                report.merged_actions = self.merge_actions(vec![action]);
            }
            RemoteEvent::PetChanged { pet } => {
                report.stage_changed = self.adopt_remote_pet(pet);
            }
        }

        if report.merged_actions > 0 || report.stage_changed {
            self.reproject(false);
            report.unlocked = self.unlock_milestones();
            if report.merged_actions > 0 {
                self.queue_stats();
            }
        }

        if !self.outbox.is_empty() {
            report.remote_error = self.flush().await.stalled;
        }
        report
    }

    /// Merge everything currently waiting on a realtime subscription
    ///
    /// If the subscription lagged and dropped events, falls back to a resync.
    pub async fn drain_events(&mut self, rx: &mut broadcast::Receiver<RemoteEvent>) -> SyncReport {
        let mut report = SyncReport::default();
        let mut lagged = false;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    let merged = self.handle_remote_event(event).await;
                    report.absorb(merged);
                }
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "realtime feed lagged");
                    lagged = true;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }

        if lagged {
            match self.resync().await {
                Ok(resynced) => report.absorb(resynced),
                Err(SyncError::Remote(e)) => report.remote_error = Some(e),
                Err(e) => tracing::warn!("resync after lag failed: {}", e),
            }
        }
        report
    }

    /// Pull the authoritative pet, care history and milestones, then push
    /// anything still queued
    pub async fn resync(&mut self) -> Result<SyncReport, SyncError> {
        let mut report = self.pull().await.map_err(SyncError::Remote)?;
        if !self.outbox.is_empty() {
            report.remote_error = self.flush().await.stalled;
        }
        Ok(report)
    }

    /// Push queued writes in order
    ///
    /// Stops at the first transient failure, leaving it and everything after
    /// it queued. Permanent failures are dropped; a refused care action is
    /// retracted from the local log and the projection replayed.
    pub async fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();

        while let Some(op) = self.outbox.front().cloned() {
            match op.send(self.remote.as_ref()).await {
                Ok(()) => {
                    self.outbox.pop_front();
                    report.sent += 1;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        op = op.name(),
                        pending = self.outbox.len(),
                        "remote write failed, kept queued: {}",
                        e
                    );
                    report.stalled = Some(e);
                    break;
                }
                Err(e) => {
                    self.outbox.pop_front();
                    tracing::warn!(op = op.name(), "remote refused write: {}", e);
                    if let PendingOp::AppendCareAction { action } = &op {
                        self.reconcile_rejected(action.id);
                    }
                    report.rejected.push((op, e));
                }
            }
        }

        report
    }

    async fn pull(&mut self) -> Result<SyncReport, RemoteError> {
        let pet_id = self.state.pet.id;
        let remote_pet = self.remote.get_pet(pet_id).await?.sanitized();
        let (actions, complete) = self.fetch_history(pet_id).await?;
        let milestones = self
            .remote
            .list_milestones(self.state.pet.couple_id)
            .await?;

        if complete {
            self.replay_base = None;
        } else {
            tracing::warn!(
                pet = %pet_id,
                fetched = actions.len(),
                "care history truncated, projecting from the remote snapshot"
            );
            self.replay_base = Some(remote_pet.clone());
        }

        let mut report = SyncReport {
            stage_changed: self.adopt_remote_pet(remote_pet),
            merged_actions: self.merge_actions(actions),
            merged_milestones: self.state.milestones.merge(milestones),
            ..SyncReport::default()
        };

        self.reproject(false);
        report.unlocked = self.unlock_milestones();
        if report.merged_actions > 0 {
            self.queue_stats();
        }

        tracing::info!(
            pet = %pet_id,
            actions = report.merged_actions,
            milestones = report.merged_milestones,
            "pulled remote state"
        );
        Ok(report)
    }

    /// Fetch the newest care actions, widening the window until it holds the
    /// whole remote history or reaches `history_max`. The flag is false when
    /// older actions were cut off.
    async fn fetch_history(&self, pet_id: PetId) -> Result<(Vec<CareAction>, bool), RemoteError> {
        let mut limit = self.history_page;
        loop {
            let actions = self.remote.list_care_actions(pet_id, limit).await?;
            if actions.len() < limit {
                return Ok((actions, true));
            }
            if limit >= self.history_max {
                return Ok((actions, false));
            }
            tracing::debug!(pet = %pet_id, limit, "care history window full, widening");
            limit = limit.saturating_mul(2).min(self.history_max);
        }
    }

    /// Union remote actions into the log; returns how many were new
    fn merge_actions(&mut self, actions: Vec<CareAction>) -> usize {
        let pet_id = self.state.pet.id;
        let mut merged = 0;
        for action in actions.into_iter().filter(|a| a.pet_id == pet_id) {
            if self.state.log.append(action) {
                merged += 1;
            }
        }
        if merged > 0 {
            tracing::debug!(pet = %pet_id, merged, "merged remote care actions");
        }
        merged
    }

    /// Take stage (monotonically) and, if it has seen later care, the
    /// projection from a remote pet row. Returns true if the stage advanced.
    fn adopt_remote_pet(&mut self, remote: Pet) -> bool {
        let remote = remote.sanitized();
        let local = &mut self.state.pet;
        let stage_changed = local.raise_stage(remote.stage);
        if stage_changed {
            tracing::info!(pet = %local.id, stage = %local.stage, "stage advanced remotely");
        }

        if remote.last_care_at > local.last_care_at {
            local.stats = remote.stats;
            local.personality = remote.personality;
            local.experience = local.experience.max(remote.experience);
            local.last_care_at = remote.last_care_at;
        }
        stage_changed
    }

    /// Replace the projection with a replay of the log when the log is at
    /// least as current as the projection (or unconditionally if `force`)
    fn reproject(&mut self, force: bool) {
        let replayed = match &self.replay_base {
            None => projection::replay(&self.state.pet, &self.state.log, &self.config),
            Some(base) => projection::replay_since(base, &self.state.pet, &self.state.log, &self.config),
        };
        if force || replayed.last_care_at >= self.state.pet.last_care_at {
            self.state.pet = replayed;
        }
    }

    fn unlock_milestones(&mut self) -> Vec<Milestone> {
        let unlocked = milestone::check_and_create(
            &mut self.state.milestones,
            &self.state.pet,
            &self.state.log,
            self.relationship.as_ref(),
            self.clock.now(),
        );
        for m in &unlocked {
            self.outbox.push(PendingOp::CreateMilestone { milestone: m.clone() });
        }
        unlocked
    }

    fn queue_stats(&mut self) {
        self.outbox.push(PendingOp::UpdateStats {
            pet_id: self.state.pet.id,
            update: StatsUpdate::from_pet(&self.state.pet),
        });
    }

    /// Undo an optimistic action the authority refused
    ///
    /// Milestones that only held because of it are withdrawn before they
    /// reach the remote; those still satisfied are unlocked again.
    fn reconcile_rejected(&mut self, action_id: CareActionId) {
        if self.state.log.retract(action_id).is_none() {
            return;
        }
        tracing::warn!(pet = %self.state.pet.id, action = %action_id, "retracted care action refused by remote");

        let withdrawn = self
            .outbox
            .drain_where(|op| matches!(op, PendingOp::CreateMilestone { .. } | PendingOp::UpdateStats { .. }));
        for op in withdrawn {
            if let PendingOp::CreateMilestone { milestone } = op {
                self.state.milestones.remove(milestone.id);
            }
        }

        self.reproject(true);
        self.unlock_milestones();
        self.queue_stats();
    }
}
