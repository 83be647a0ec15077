//! Append-only care log
//!
//! Entries are immutable and globally unique by id, so two partners' logs
//! merge by set union with no conflicts. Iteration order is chronological
//! with ids breaking ties, independent of insertion order.

use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::care::action::{CareAction, CareActionType};
use crate::core::types::{CareActionId, PartnerId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CareAction>", into = "Vec<CareAction>")]
pub struct CareLog {
    entries: Vec<CareAction>,
    ids: AHashSet<CareActionId>,
}

impl CareLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action; returns false if its id is already present
    pub fn append(&mut self, action: CareAction) -> bool {
        if !self.ids.insert(action.id) {
            return false;
        }
        let key = action.order_key();
        let pos = self
            .entries
            .partition_point(|existing| existing.order_key() < key);
        self.entries.insert(pos, action);
        true
    }

    /// Union with another set of actions; returns how many were new
    pub fn merge<I>(&mut self, actions: I) -> usize
    where
        I: IntoIterator<Item = CareAction>,
    {
        actions
            .into_iter()
            .filter(|a| self.append(a.clone()))
            .count()
    }

    /// Remove an optimistic entry the remote authority refused
    ///
    /// Only the sync reconciliation path calls this.
    pub(crate) fn retract(&mut self, id: CareActionId) -> Option<CareAction> {
        if !self.ids.remove(&id) {
            return None;
        }
        let pos = self.entries.iter().position(|a| a.id == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn contains(&self, id: CareActionId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chronological iteration
    pub fn iter(&self) -> impl Iterator<Item = &CareAction> {
        self.entries.iter()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.entries.iter().map(|a| a.performed_at)
    }

    pub fn latest(&self) -> Option<&CareAction> {
        self.entries.last()
    }

    /// Most recent action of the given type, the cooldown anchor for that type
    pub fn last_of_type(&self, action_type: CareActionType) -> Option<&CareAction> {
        self.entries
            .iter()
            .rev()
            .find(|a| a.action_type == action_type)
    }

    pub fn by_actor(&self, actor: PartnerId) -> impl Iterator<Item = &CareAction> {
        self.entries.iter().filter(move |a| a.actor == actor)
    }

    /// Distinct partners that have given care, in order of first appearance
    pub fn actors(&self) -> Vec<PartnerId> {
        let mut seen = Vec::new();
        for a in &self.entries {
            if !seen.contains(&a.actor) {
                seen.push(a.actor);
            }
        }
        seen
    }

    /// Distinct action types used so far, in canonical order
    pub fn action_types(&self) -> Vec<CareActionType> {
        CareActionType::ALL
            .into_iter()
            .filter(|t| self.entries.iter().any(|a| a.action_type == *t))
            .collect()
    }
}

impl From<Vec<CareAction>> for CareLog {
    fn from(actions: Vec<CareAction>) -> Self {
        let mut log = CareLog::new();
        log.merge(actions);
        log
    }
}

impl From<CareLog> for Vec<CareAction> {
    fn from(log: CareLog) -> Self {
        log.entries
    }
}

impl FromIterator<CareAction> for CareLog {
    fn from_iter<I: IntoIterator<Item = CareAction>>(iter: I) -> Self {
        let mut log = CareLog::new();
        log.merge(iter);
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PetId;
    use chrono::{Duration, TimeZone};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn test_append_orders_chronologically() {
        let pet = PetId::new();
        let actor = PartnerId::new();
        let mut log = CareLog::new();
        let late = CareAction::new(pet, actor, CareActionType::Play, at(5));
        let early = CareAction::new(pet, actor, CareActionType::Feed, at(1));
        log.append(late.clone());
        log.append(early.clone());

        let order: Vec<_> = log.iter().map(|a| a.id).collect();
        assert_eq!(order, vec![early.id, late.id]);
        assert_eq!(log.latest().map(|a| a.id), Some(late.id));
    }

    #[test]
    fn test_duplicate_ids_ignored() {
        let action = CareAction::new(PetId::new(), PartnerId::new(), CareActionType::Feed, at(0));
        let mut log = CareLog::new();
        assert!(log.append(action.clone()));
        assert!(!log.append(action));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let pet = PetId::new();
        let a = CareAction::new(pet, PartnerId::new(), CareActionType::Feed, at(2));
        let b = CareAction::new(pet, PartnerId::new(), CareActionType::Walk, at(2));

        let ab: CareLog = vec![a.clone(), b.clone()].into_iter().collect();
        let ba: CareLog = vec![b, a].into_iter().collect();
        let ab_ids: Vec<_> = ab.iter().map(|x| x.id).collect();
        let ba_ids: Vec<_> = ba.iter().map(|x| x.id).collect();
        assert_eq!(ab_ids, ba_ids);
    }

    #[test]
    fn test_last_of_type() {
        let pet = PetId::new();
        let actor = PartnerId::new();
        let first = CareAction::new(pet, actor, CareActionType::Feed, at(1));
        let second = CareAction::new(pet, actor, CareActionType::Feed, at(3));
        let play = CareAction::new(pet, actor, CareActionType::Play, at(4));
        let log: CareLog = vec![second.clone(), play, first].into_iter().collect();

        assert_eq!(log.last_of_type(CareActionType::Feed).map(|a| a.id), Some(second.id));
        assert!(log.last_of_type(CareActionType::Groom).is_none());
    }

    #[test]
    fn test_retract() {
        let action = CareAction::new(PetId::new(), PartnerId::new(), CareActionType::Pet, at(0));
        let mut log: CareLog = vec![action.clone()].into_iter().collect();
        assert_eq!(log.retract(action.id), Some(action.clone()));
        assert!(log.is_empty());
        assert!(!log.contains(action.id));
        assert_eq!(log.retract(action.id), None);
    }

    #[test]
    fn test_actors_and_types() {
        let pet = PetId::new();
        let alex = PartnerId::new();
        let sam = PartnerId::new();
        let log: CareLog = vec![
            CareAction::new(pet, alex, CareActionType::Groom, at(0)),
            CareAction::new(pet, sam, CareActionType::Feed, at(1)),
            CareAction::new(pet, alex, CareActionType::Feed, at(2)),
        ]
        .into_iter()
        .collect();

        assert_eq!(log.actors(), vec![alex, sam]);
        assert_eq!(log.action_types(), vec![CareActionType::Feed, CareActionType::Groom]);
        assert_eq!(log.by_actor(alex).count(), 2);
    }

    #[test]
    fn test_serde_roundtrip_restores_index() {
        let action = CareAction::new(PetId::new(), PartnerId::new(), CareActionType::Walk, at(0));
        let log: CareLog = vec![action.clone()].into_iter().collect();
        let json = serde_json::to_string(&log).unwrap();
        let restored: CareLog = serde_json::from_str(&json).unwrap();
        assert!(restored.contains(action.id));
    }
}
