//! Ordered queue of remote writes not yet confirmed
//!
//! Local care is applied optimistically; every write the remote still has to
//! see lives here until it succeeds. Nothing is dropped on a transient
//! failure, only on a permanent one (after reconciliation).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::care::action::CareAction;
use crate::core::types::{CareActionId, PetId};
use crate::lifecycle::milestone::Milestone;
use crate::pet::stage::Stage;
use crate::sync::remote::{RemoteError, RemoteStore, StatsUpdate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOp {
    AppendCareAction { action: CareAction },
    UpdateStats { pet_id: PetId, update: StatsUpdate },
    UpdateStage { pet_id: PetId, stage: Stage },
    CreateMilestone { milestone: Milestone },
}

impl PendingOp {
    pub fn name(&self) -> &'static str {
        match self {
            PendingOp::AppendCareAction { .. } => "append_care_action",
            PendingOp::UpdateStats { .. } => "update_pet_stats",
            PendingOp::UpdateStage { .. } => "update_stage",
            PendingOp::CreateMilestone { .. } => "create_milestone",
        }
    }

    /// Send this write to the remote store
    pub async fn send(&self, remote: &dyn RemoteStore) -> Result<(), RemoteError> {
        match self {
            PendingOp::AppendCareAction { action } => remote.append_care_action(action).await,
            PendingOp::UpdateStats { pet_id, update } => remote.update_pet_stats(*pet_id, update).await,
            PendingOp::UpdateStage { pet_id, stage } => remote.update_stage(*pet_id, *stage).await,
            PendingOp::CreateMilestone { milestone } => remote.create_milestone(milestone).await,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outbox {
    ops: VecDeque<PendingOp>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write
    ///
    /// A newer stats update replaces any queued one for the same pet, since
    /// only the latest projection matters.
    pub fn push(&mut self, op: PendingOp) {
        if let PendingOp::UpdateStats { pet_id, .. } = &op {
            let pet_id = *pet_id;
            self.ops
                .retain(|queued| !matches!(queued, PendingOp::UpdateStats { pet_id: p, .. } if *p == pet_id));
        }
        self.ops.push_back(op);
    }

    pub fn front(&self) -> Option<&PendingOp> {
        self.ops.front()
    }

    pub fn pop_front(&mut self) -> Option<PendingOp> {
        self.ops.pop_front()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOp> {
        self.ops.iter()
    }

    /// Care actions still waiting to reach the remote
    pub fn pending_actions(&self) -> Vec<CareActionId> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                PendingOp::AppendCareAction { action } => Some(action.id),
                _ => None,
            })
            .collect()
    }

    /// Remove every queued op matching `predicate`, returning them
    pub fn drain_where<F>(&mut self, mut predicate: F) -> Vec<PendingOp>
    where
        F: FnMut(&PendingOp) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.ops.len());
        for op in self.ops.drain(..) {
            if predicate(&op) {
                removed.push(op);
            } else {
                kept.push_back(op);
            }
        }
        self.ops = kept;
        removed
    }
}
