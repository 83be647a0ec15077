//! In-process remote authority
//!
//! Implements [`RemoteStore`] over plain maps and publishes realtime
//! [`RemoteEvent`]s on a broadcast channel. It applies the same care
//! validation as the local resolver, so it behaves as the authoritative
//! side in tests and the simulator. An offline switch simulates outages.

use ahash::AHashMap;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::care::action::CareAction;
use crate::care::log::CareLog;
use crate::care::resolver;
use crate::core::config::PetConfig;
use crate::core::types::{CoupleId, PetId};
use crate::lifecycle::milestone::{Milestone, MilestoneBook};
use crate::pet::stage::Stage;
use crate::pet::Pet;
use crate::sync::events::RemoteEvent;
use crate::sync::remote::{RemoteError, RemoteStore, StatsUpdate};

const EVENT_CAPACITY: usize = 256;

#[derive(Default)]
struct Tables {
    pets: AHashMap<PetId, Pet>,
    actions: AHashMap<PetId, CareLog>,
    milestones: AHashMap<CoupleId, MilestoneBook>,
}

pub struct InMemoryRemote {
    tables: Mutex<Tables>,
    events: broadcast::Sender<RemoteEvent>,
    config: Arc<PetConfig>,
    offline: AtomicBool,
    write_count: AtomicU32,
}

impl InMemoryRemote {
    pub fn new(config: Arc<PetConfig>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tables: Mutex::new(Tables::default()),
            events,
            config,
            offline: AtomicBool::new(false),
            write_count: AtomicU32::new(0),
        }
    }

    /// Realtime feed of changes to any pet
    pub fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.events.subscribe()
    }

    /// While offline every call fails with a transient error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of successful writes, duplicates included
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Authoritative copy of a pet's care log
    pub fn care_log(&self, pet_id: PetId) -> CareLog {
        self.tables().actions.get(&pet_id).cloned().unwrap_or_default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.is_offline() {
            return Err(RemoteError::Unavailable("remote is offline".into()));
        }
        Ok(())
    }

    fn wrote(&self) {
        self.write_count.fetch_add(1, Ordering::SeqCst);
    }

    fn publish(&self, event: RemoteEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn pet_not_found(pet_id: PetId) -> RemoteError {
    RemoteError::NotFound(format!("pet {}", pet_id))
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn create_pet(&self, pet: &Pet) -> Result<(), RemoteError> {
        self.ensure_online()?;
        let mut tables = self.tables();
        if tables.pets.contains_key(&pet.id) {
            return Ok(());
        }
        tables.pets.insert(pet.id, pet.clone());
        tables.actions.entry(pet.id).or_default();
        tables
            .milestones
            .entry(pet.couple_id)
            .or_insert_with(|| MilestoneBook::new(pet.couple_id));
        drop(tables);

        self.wrote();
        self.publish(RemoteEvent::PetChanged { pet: pet.clone() });
        Ok(())
    }

    async fn get_pet(&self, pet_id: PetId) -> Result<Pet, RemoteError> {
        self.ensure_online()?;
        self.tables()
            .pets
            .get(&pet_id)
            .cloned()
            .ok_or_else(|| pet_not_found(pet_id))
    }

    async fn update_pet_stats(&self, pet_id: PetId, update: &StatsUpdate) -> Result<(), RemoteError> {
        self.ensure_online()?;
        let mut tables = self.tables();
        let pet = tables.pets.get_mut(&pet_id).ok_or_else(|| pet_not_found(pet_id))?;
        // A projection that has seen less care than the stored one is stale
        if update.last_care_at < pet.last_care_at {
            tracing::debug!(pet = %pet_id, "ignoring stale stats update");
            return Ok(());
        }
        pet.stats = update.stats;
        pet.personality = update.personality;
        pet.experience = pet.experience.max(update.experience);
        pet.last_care_at = update.last_care_at;
        let snapshot = pet.clone();
        drop(tables);

        self.wrote();
        self.publish(RemoteEvent::PetChanged { pet: snapshot });
        Ok(())
    }

    async fn append_care_action(&self, action: &CareAction) -> Result<(), RemoteError> {
        self.ensure_online()?;
        let mut tables = self.tables();
        let pet = tables
            .pets
            .get(&action.pet_id)
            .cloned()
            .ok_or_else(|| pet_not_found(action.pet_id))?;
        let log = tables.actions.entry(action.pet_id).or_default();

        if log.contains(action.id) {
            return Ok(());
        }

        resolver::check_against_log(&pet, action.action_type, log, action.performed_at, &self.config)
            .map_err(|rejection| RemoteError::Rejected(rejection.to_string()))?;

        log.append(action.clone());
        drop(tables);

        self.wrote();
        self.publish(RemoteEvent::CareActionInserted {
            action: action.clone(),
        });
        Ok(())
    }

    async fn update_stage(&self, pet_id: PetId, stage: Stage) -> Result<(), RemoteError> {
        self.ensure_online()?;
        let mut tables = self.tables();
        let pet = tables.pets.get_mut(&pet_id).ok_or_else(|| pet_not_found(pet_id))?;
        let changed = pet.raise_stage(stage);
        let snapshot = pet.clone();
        drop(tables);

        self.wrote();
        if changed {
            self.publish(RemoteEvent::PetChanged { pet: snapshot });
        }
        Ok(())
    }

    async fn create_milestone(&self, milestone: &Milestone) -> Result<(), RemoteError> {
        self.ensure_online()?;
        self.tables()
            .milestones
            .entry(milestone.couple_id)
            .or_insert_with(|| MilestoneBook::new(milestone.couple_id))
            .insert(milestone.clone());
        self.wrote();
        Ok(())
    }

    async fn list_milestones(&self, couple_id: CoupleId) -> Result<Vec<Milestone>, RemoteError> {
        self.ensure_online()?;
        Ok(self
            .tables()
            .milestones
            .get(&couple_id)
            .map(|book| book.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_care_actions(&self, pet_id: PetId, limit: usize) -> Result<Vec<CareAction>, RemoteError> {
        self.ensure_online()?;
        let tables = self.tables();
        let log = tables.actions.get(&pet_id).ok_or_else(|| pet_not_found(pet_id))?;
        let skip = log.len().saturating_sub(limit);
        Ok(log.iter().skip(skip).cloned().collect())
    }
}
