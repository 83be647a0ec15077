//! Integration tests for two partners sharing one pet
//!
//! Each partner runs its own coordinator against a shared in-memory authority:
//! - Concurrent care converges regardless of merge order
//! - Care made offline is queued and delivered later
//! - A write the authority refuses is retracted locally
//! - Evolution from a stale view is idempotent
//! - A lagged feed or a long history still ends in the partner's projection

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::broadcast;

use shared_pet::care::CareActionType;
use shared_pet::core::types::{CoupleId, PartnerId, Species};
use shared_pet::core::{ManualClock, PetConfig};
use shared_pet::lifecycle::EvolutionOutcome;
use shared_pet::pet::stage::Stage;
use shared_pet::pet::stats::Stats;
use shared_pet::pet::Pet;
use shared_pet::sync::{InMemoryRemote, RemoteEvent, RemoteStore, SyncCoordinator, SyncError};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

struct Device {
    sync: SyncCoordinator,
    events: broadcast::Receiver<RemoteEvent>,
}

impl Device {
    async fn catch_up(&mut self) {
        self.sync.drain_events(&mut self.events).await;
    }

    fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.sync.milestones().titles().into_iter().map(String::from).collect();
        titles.sort();
        titles
    }
}

struct Household {
    remote: Arc<InMemoryRemote>,
    clock: Arc<ManualClock>,
    first: Device,
    second: Device,
}

async fn household(stage: Stage) -> Household {
    let config = Arc::new(PetConfig::default());
    let remote = Arc::new(InMemoryRemote::new(config.clone()));
    let clock = Arc::new(ManualClock::new(t0()));
    let pet = Pet::new(CoupleId::new(), "Mochi", Species::Dog, t0()).with_stage(stage);
    let pet_id = pet.id;

    let first = SyncCoordinator::create(PartnerId::new(), pet, remote.clone(), clock.clone(), config.clone())
        .await
        .unwrap();
    let second = SyncCoordinator::connect(PartnerId::new(), pet_id, remote.clone(), clock.clone(), config)
        .await
        .unwrap();

    Household {
        first: Device {
            sync: first,
            events: remote.subscribe(),
        },
        second: Device {
            sync: second,
            events: remote.subscribe(),
        },
        remote,
        clock,
    }
}

fn assert_converged(a: &Device, b: &Device) {
    assert_eq!(a.sync.log().len(), b.sync.log().len());
    assert_eq!(a.sync.pet().stage, b.sync.pet().stage);
    assert_eq!(a.sync.pet().stats, b.sync.pet().stats);
    assert_eq!(a.sync.pet().personality, b.sync.pet().personality);
    assert_eq!(a.sync.pet().experience, b.sync.pet().experience);
    assert_eq!(a.sync.streak(), b.sync.streak());
    assert_eq!(a.titles(), b.titles());
}

/// The first partner plays every five minutes, just past the cooldown
async fn play_repeatedly(home: &mut Household, times: usize) {
    for _ in 0..times {
        home.clock.advance(Duration::minutes(5));
        home.first.sync.perform_care(CareActionType::Play).await.unwrap();
    }
}

/// Both partners care before seeing each other's action, then merge
async fn concurrent_care(second_merges_first: bool) -> Stats {
    let mut home = household(Stage::Baby).await;

    home.clock.set(t0() + Duration::hours(2));
    home.first.sync.perform_care(CareActionType::Feed).await.unwrap();
    home.clock.set(t0() + Duration::hours(2) + Duration::minutes(1));
    home.second.sync.perform_care(CareActionType::Play).await.unwrap();

    if second_merges_first {
        home.second.catch_up().await;
        home.first.catch_up().await;
    } else {
        home.first.catch_up().await;
        home.second.catch_up().await;
    }

    assert_converged(&home.first, &home.second);
    assert_eq!(home.first.sync.log().len(), 2);
    assert!(home.first.titles().contains(&"Teamwork".to_string()));

    // The authority ends up holding the merged projection too
    let stored = home.remote.get_pet(home.first.sync.pet().id).await.unwrap();
    assert_eq!(stored.stats, home.first.sync.pet().stats);

    home.first.sync.pet().stats
}

#[tokio::test]
async fn test_concurrent_care_converges_in_either_order() {
    let one_way = concurrent_care(true).await;
    let other_way = concurrent_care(false).await;
    assert_eq!(one_way, other_way);
}

#[tokio::test]
async fn test_offline_care_is_delivered_later() {
    let mut home = household(Stage::Baby).await;

    home.remote.set_offline(true);
    let receipt = home.first.sync.perform_care(CareActionType::Walk).await.unwrap();
    assert!(!receipt.is_synced());
    assert_eq!(home.first.sync.outbox().pending_actions(), vec![receipt.action.id]);

    // Still queued while the outage lasts
    home.clock.advance(Duration::minutes(10));
    assert!(home.first.sync.flush().await.stalled.is_some());
    home.second.catch_up().await;
    assert!(home.second.sync.log().is_empty());

    home.remote.set_offline(false);
    let flushed = home.first.sync.flush().await;
    assert!(flushed.stalled.is_none());
    assert!(flushed.rejected.is_empty());
    assert!(home.first.sync.outbox().is_empty());

    home.second.catch_up().await;
    assert!(home.second.sync.log().contains(receipt.action.id));
    assert_converged(&home.first, &home.second);
}

/// Both feed within the cooldown; the one that reaches the authority second
/// is refused and rolled back
#[tokio::test]
async fn test_conflicting_offline_care_is_retracted() {
    let mut home = household(Stage::Baby).await;

    home.remote.set_offline(true);
    home.clock.set(t0() + Duration::hours(1));
    home.second.sync.perform_care(CareActionType::Feed).await.unwrap();

    home.remote.set_offline(false);
    home.clock.set(t0() + Duration::hours(1) + Duration::minutes(2));
    let accepted = home.first.sync.perform_care(CareActionType::Feed).await.unwrap();
    assert!(accepted.is_synced());

    let flushed = home.second.sync.flush().await;
    assert_eq!(flushed.rejected.len(), 1);
    assert!(home.second.sync.log().is_empty());
    assert!(home.second.sync.outbox().pending_actions().is_empty());

    home.second.catch_up().await;
    home.first.catch_up().await;
    assert_eq!(home.second.sync.log().len(), 1);
    assert!(home.second.sync.log().contains(accepted.action.id));
    assert_converged(&home.first, &home.second);
}

#[tokio::test]
async fn test_cooldown_is_shared_between_partners() {
    let mut home = household(Stage::Baby).await;

    home.first.sync.perform_care(CareActionType::Groom).await.unwrap();
    home.second.catch_up().await;

    home.clock.advance(Duration::minutes(2));
    assert!(!home.second.sync.can_perform(CareActionType::Groom));
    let err = home.second.sync.perform_care(CareActionType::Groom).await.unwrap_err();
    assert!(matches!(err, SyncError::Rejected(_)));

    home.clock.advance(Duration::minutes(3));
    assert!(home.second.sync.can_perform(CareActionType::Groom));
}

#[tokio::test]
async fn test_hatching_reaches_both_partners_once() {
    let mut home = household(Stage::Egg).await;

    // Both devices decide to hatch from the egg they see
    let first = home.first.sync.evolve_from(Stage::Egg).await.unwrap();
    assert!(matches!(first.outcome, EvolutionOutcome::Evolved { to: Stage::Baby, .. }));

    home.second.catch_up().await;
    assert_eq!(home.second.sync.pet().stage, Stage::Baby);
    let second = home.second.sync.evolve_from(Stage::Egg).await.unwrap();
    assert!(matches!(second.outcome, EvolutionOutcome::AlreadyApplied { .. }));

    let stored = home.remote.get_pet(home.first.sync.pet().id).await.unwrap();
    assert_eq!(stored.stage, Stage::Baby);
    let milestones = home.remote.list_milestones(stored.couple_id).await.unwrap();
    assert_eq!(milestones.len(), 1);
    assert_eq!(milestones[0].title, "Hatched");
}

#[tokio::test]
async fn test_resync_recovers_missed_history() {
    let mut home = household(Stage::Baby).await;

    home.first.sync.perform_care(CareActionType::Feed).await.unwrap();
    home.clock.advance(Duration::hours(1));
    home.first.sync.perform_care(CareActionType::Pet).await.unwrap();

    // The second device never reads its realtime feed
    let report = home.second.sync.resync().await.unwrap();
    assert_eq!(report.merged_actions, 2);
    assert!(report.remote_error.is_none());
    assert_converged(&home.first, &home.second);

    // A fresh device connecting later sees the same pet
    let late = SyncCoordinator::connect(
        PartnerId::new(),
        home.first.sync.pet().id,
        home.remote.clone(),
        home.clock.clone(),
        Arc::new(PetConfig::default()),
    )
    .await
    .unwrap();
    assert_eq!(late.pet().stats, home.first.sync.pet().stats);
    assert_eq!(late.log().len(), 2);
}

#[tokio::test]
async fn test_lagged_feed_falls_back_to_resync() {
    let mut home = household(Stage::Baby).await;

    // Each care action publishes an insert and a pet change, overflowing the feed
    play_repeatedly(&mut home, 150).await;

    let report = home.second.sync.drain_events(&mut home.second.events).await;
    assert!(report.remote_error.is_none());
    assert_eq!(report.merged_actions, 150);
    home.first.catch_up().await;

    assert_eq!(home.second.sync.pet().experience, 1_500);
    assert_converged(&home.first, &home.second);
}

#[tokio::test]
async fn test_resync_widens_window_to_full_history() {
    let mut home = household(Stage::Baby).await;

    home.first.sync.perform_care(CareActionType::Feed).await.unwrap();
    home.second.catch_up().await;
    assert_eq!(home.second.sync.pet().experience, 10);

    // The partner keeps caring while this device is not listening
    play_repeatedly(&mut home, 12).await;
    home.second.sync.set_history_window(4, 64);
    let report = home.second.sync.resync().await.unwrap();

    assert_eq!(report.merged_actions, 12);
    assert!(home.second.sync.has_full_history());
    assert_eq!(home.second.sync.pet().experience, 130);
    home.first.catch_up().await;
    assert_converged(&home.first, &home.second);
}

/// History longer than the widest window projects from the remote row, and
/// a later rejection does not fall back to replaying the gapped log
#[tokio::test]
async fn test_truncated_history_keeps_remote_projection() {
    let mut home = household(Stage::Baby).await;

    home.first.sync.perform_care(CareActionType::Feed).await.unwrap();
    home.second.catch_up().await;
    play_repeatedly(&mut home, 12).await;

    home.second.sync.set_history_window(4, 8);
    home.second.sync.resync().await.unwrap();
    home.second.events = home.remote.subscribe();

    assert!(!home.second.sync.has_full_history());
    assert_eq!(home.second.sync.log().len(), 9);
    assert_eq!(home.second.sync.pet().experience, 130);
    assert_eq!(home.second.sync.pet().stats, home.first.sync.pet().stats);
    assert_eq!(home.second.sync.pet().personality, home.first.sync.pet().personality);

    // The partner grooms; this device grooms before hearing about it
    home.clock.advance(Duration::minutes(5));
    home.first.sync.perform_care(CareActionType::Groom).await.unwrap();
    home.clock.advance(Duration::minutes(1));
    let err = home.second.sync.perform_care(CareActionType::Groom).await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteRejected { .. }));
    assert_eq!(home.second.sync.pet().experience, 130);

    home.second.catch_up().await;
    assert_eq!(home.second.sync.pet().experience, home.first.sync.pet().experience);
    assert_eq!(home.second.sync.pet().stats, home.first.sync.pet().stats);
    assert_eq!(home.second.sync.pet().personality, home.first.sync.pet().personality);
}
