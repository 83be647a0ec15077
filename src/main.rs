//! Shared Pet - Care Simulator
//!
//! Drives two partners caring for one shared pet against an in-memory remote
//! authority, with optional simulated outages, and reports where the pet ends
//! up. Both partners' devices should agree on the pet once everything has
//! been flushed and merged.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Parser;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;

use shared_pet::care::CareActionType;
use shared_pet::core::error::Result;
use shared_pet::core::types::{CoupleId, PartnerId, Species};
use shared_pet::core::{ManualClock, PetConfig};
use shared_pet::lifecycle::milestone::RelationshipContext;
use shared_pet::pet::stage::Stage;
use shared_pet::pet::stats::Stats;
use shared_pet::pet::{Mood, Pet};
use shared_pet::sync::{InMemoryRemote, RemoteEvent, SyncCoordinator, SyncError};

/// Two-partner shared pet simulator
#[derive(Parser, Debug)]
#[command(name = "pet-sim")]
#[command(about = "Simulate two partners caring for a shared pet")]
struct Args {
    /// Number of simulated days
    #[arg(long, default_value_t = 14)]
    days: u32,

    /// Care attempts per day, split between both partners
    #[arg(long, default_value_t = 6)]
    actions_per_day: u32,

    /// Probability that the remote is unreachable for a given attempt (0.0 to 1.0)
    #[arg(long, default_value_t = 0.1, value_parser = parse_probability)]
    outage_rate: f64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Pet configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pet name
    #[arg(long, default_value = "Mochi")]
    name: String,

    /// Pet species (cat, dog, bunny, dragon, fox)
    #[arg(long, default_value = "cat")]
    species: Species,

    /// Days the couple had been together before the pet arrived
    #[arg(long, default_value_t = 0)]
    together_days: u32,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn parse_probability(s: &str) -> std::result::Result<f64, String> {
    let p: f64 = s.trim().parse().map_err(|e| format!("not a number: {}", e))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(format!("{} is not a probability between 0 and 1", s));
    }
    Ok(p)
}

#[derive(Debug, Default, Serialize)]
struct Counters {
    performed: u32,
    rejected: u32,
    refused_by_remote: u32,
    queued_while_offline: u32,
    evolutions: u32,
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    seed: u64,
    days: u32,
    name: String,
    species: Species,
    stage: Stage,
    stats: Stats,
    mood: Mood,
    dominant_trait: String,
    experience: u64,
    current_streak: u32,
    longest_streak: u32,
    care_actions: usize,
    milestones: Vec<String>,
    counters: Counters,
    converged: bool,
}

struct Partner {
    sync: SyncCoordinator,
    events: broadcast::Receiver<RemoteEvent>,
}

impl Partner {
    async fn catch_up(&mut self) {
        let report = self.sync.drain_events(&mut self.events).await;
        for m in &report.unlocked {
            tracing::info!(partner = %self.sync.partner(), "milestone unlocked on merge: {}", m.title);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shared_pet=info,pet_sim=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PetConfig::load(path)?,
        None => PetConfig::default(),
    };
    config.validate()?;

    let rt = Runtime::new()?;
    let summary = rt.block_on(simulate(&args, Arc::new(config)))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

async fn simulate(args: &Args, config: Arc<PetConfig>) -> Result<SimulationSummary> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!(seed, days = args.days, "starting simulation");

    let start = start_time();
    let clock = Arc::new(ManualClock::new(start));
    let remote = Arc::new(InMemoryRemote::new(config.clone()));

    let pet = Pet::new(CoupleId::new(), args.name.clone(), args.species, start);
    let pet_id = pet.id;

    let first = SyncCoordinator::create(PartnerId::new(), pet, remote.clone(), clock.clone(), config.clone()).await?;
    let second = SyncCoordinator::connect(PartnerId::new(), pet_id, remote.clone(), clock.clone(), config.clone()).await?;
    let mut partners = [
        Partner {
            sync: first,
            events: remote.subscribe(),
        },
        Partner {
            sync: second,
            events: remote.subscribe(),
        },
    ];

    let mut counters = Counters::default();

    for day in 0..args.days {
        let day_start = start + Duration::days(i64::from(day));
        let relationship = RelationshipContext {
            days_together: args.together_days + day,
        };
        for partner in partners.iter_mut() {
            partner.sync.set_relationship(relationship);
        }

        // Hatch or grow as soon as either device sees the pet is ready
        clock.set(day_start);
        remote.set_offline(false);
        for partner in partners.iter_mut() {
            partner.catch_up().await;
            if partner.sync.eligibility().is_eligible {
                match partner.sync.evolve().await {
                    Ok(receipt) => {
                        tracing::info!(partner = %partner.sync.partner(), "evolution: {:?}", receipt.outcome);
                        counters.evolutions += 1;
                    }
                    Err(e) => tracing::warn!("evolution failed: {}", e),
                }
            }
        }

        let mut minutes: Vec<i64> = (0..args.actions_per_day)
            .map(|_| rng.gen_range(0..14 * 60))
            .collect();
        minutes.sort_unstable();

        for offset in minutes {
            clock.set(day_start + Duration::minutes(offset));
            remote.set_offline(rng.gen_bool(args.outage_rate));

            let who = rng.gen_range(0..partners.len());
            let action_type = *CareActionType::ALL
                .choose(&mut rng)
                .unwrap_or(&CareActionType::Pet);

            let partner = &mut partners[who];
            partner.catch_up().await;
            match partner.sync.perform_care(action_type).await {
                Ok(receipt) => {
                    counters.performed += 1;
                    if !receipt.is_synced() {
                        counters.queued_while_offline += 1;
                    }
                    for m in &receipt.unlocked {
                        tracing::info!(partner = %partner.sync.partner(), "milestone unlocked: {}", m.title);
                    }
                }
                Err(SyncError::Rejected(reason)) => {
                    tracing::debug!("{} skipped: {}", action_type, reason);
                    counters.rejected += 1;
                }
                Err(SyncError::RemoteRejected { .. }) => {
                    counters.refused_by_remote += 1;
                }
                Err(e) => tracing::warn!("care failed: {}", e),
            }
        }
    }

    // Settle: everything reachable, every write flushed, every event merged
    clock.set(start + Duration::days(i64::from(args.days)) - Duration::hours(1));
    remote.set_offline(false);
    for _ in 0..2 {
        for partner in partners.iter_mut() {
            partner.sync.flush().await;
            partner.catch_up().await;
        }
    }
    for partner in partners.iter_mut() {
        partner.sync.resync().await?;
    }

    let [a, b] = &partners;
    let converged = a.sync.pet().stage == b.sync.pet().stage
        && a.sync.pet().stats == b.sync.pet().stats
        && a.sync.log().len() == b.sync.log().len()
        && sorted_titles(&a.sync) == sorted_titles(&b.sync);
    if !converged {
        tracing::warn!("partners did not converge");
    }

    let sync = &a.sync;
    let pet = sync.pet();
    let streak = sync.streak();
    Ok(SimulationSummary {
        seed,
        days: args.days,
        name: pet.name.clone(),
        species: pet.species,
        stage: pet.stage,
        stats: sync.current_stats(),
        mood: Mood::from_stats(&sync.current_stats()),
        dominant_trait: format!("{:?}", pet.dominant_trait()),
        experience: pet.experience,
        current_streak: streak.current_streak,
        longest_streak: streak.longest_streak,
        care_actions: sync.log().len(),
        milestones: sorted_titles(sync),
        counters,
        converged,
    })
}

fn sorted_titles(sync: &SyncCoordinator) -> Vec<String> {
    let mut titles: Vec<String> = sync.milestones().titles().into_iter().map(String::from).collect();
    titles.sort();
    titles
}

fn print_summary(summary: &SimulationSummary) {
    println!("\n=== SHARED PET ===");
    println!("{} the {} ({} days, seed {})", summary.name, summary.species, summary.days, summary.seed);
    println!("Stage: {}", summary.stage);
    println!(
        "Stats: hunger {} / happiness {} / energy {} ({:?})",
        summary.stats.hunger, summary.stats.happiness, summary.stats.energy, summary.mood
    );
    println!("Personality: {}", summary.dominant_trait);
    println!("Experience: {}", summary.experience);
    println!(
        "Streak: {} current, {} longest",
        summary.current_streak, summary.longest_streak
    );
    println!();
    println!("--- Care ---");
    println!("Performed: {}", summary.counters.performed);
    println!("Skipped (cooldown/egg): {}", summary.counters.rejected);
    println!("Refused by remote: {}", summary.counters.refused_by_remote);
    println!("Queued while offline: {}", summary.counters.queued_while_offline);
    println!("Evolutions: {}", summary.counters.evolutions);
    println!();
    println!("--- Milestones ({}) ---", summary.milestones.len());
    for title in &summary.milestones {
        println!("  {}", title);
    }
    println!();
    println!("Partners converged: {}", summary.converged);
}
