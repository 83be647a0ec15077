//! Property tests for the derived pet state
//!
//! Stats stay in range under any care and decay, and the projection depends
//! only on the set of logged actions, not on the order they were merged in.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use shared_pet::care::projection::replay;
use shared_pet::care::{CareAction, CareActionType, CareLog};
use shared_pet::core::types::{CoupleId, PartnerId, Species};
use shared_pet::core::PetConfig;
use shared_pet::lifecycle::streak;
use shared_pet::pet::personality::{Personality, PersonalityTrait, TraitNudge};
use shared_pet::pet::stage::Stage;
use shared_pet::pet::stats::{decay, DecayRates, StatDelta, StatKind, Stats};
use shared_pet::pet::Pet;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
}

fn action_type() -> impl Strategy<Value = CareActionType> {
    prop::sample::select(CareActionType::ALL.to_vec())
}

fn stat_kind() -> impl Strategy<Value = StatKind> {
    prop::sample::select(StatKind::ALL.to_vec())
}

proptest! {
    #[test]
    fn stats_stay_in_range(
        hunger in any::<u8>(),
        happiness in any::<u8>(),
        energy in any::<u8>(),
        dh in -500i32..500,
        dp in -500i32..500,
        de in -500i32..500,
    ) {
        let stats = Stats::new(hunger, happiness, energy).apply(StatDelta {
            hunger: dh,
            happiness: dp,
            energy: de,
        });
        prop_assert!(stats.hunger <= 100);
        prop_assert!(stats.happiness <= 100);
        prop_assert!(stats.energy <= 100);
    }

    #[test]
    fn decay_is_bounded_and_monotonic(stat in stat_kind(), a in 0.0f64..500.0, b in 0.0f64..500.0) {
        let rates = DecayRates::default();
        let (short, long) = if a <= b { (a, b) } else { (b, a) };
        let d_short = decay(stat, short, &rates);
        let d_long = decay(stat, long, &rates);

        prop_assert!(d_short <= 0);
        prop_assert!(d_long >= -100);
        prop_assert!(d_long <= d_short);
        prop_assert_eq!(d_short, decay(stat, short, &rates));
    }

    #[test]
    fn personality_weights_capped(nudges in prop::collection::vec((0u8..5, 0u8..5, 0u8..5, 0u8..5), 0..200)) {
        let personality = nudges.into_iter().fold(Personality::default(), |p, (a, b, c, d)| {
            p.nudged(TraitNudge::new(a, b, c, d))
        });
        for t in PersonalityTrait::ALL {
            prop_assert!(personality.weight(t) <= 100);
        }
    }

    #[test]
    fn merge_order_does_not_change_projection(
        plan in prop::collection::vec((0i64..(14 * 24 * 60), action_type(), any::<bool>()), 1..40),
        rotate in 0usize..40,
    ) {
        let config = PetConfig::default();
        let pet = Pet::new(CoupleId::new(), "Mochi", Species::Fox, t0()).with_stage(Stage::Child);
        let (a, b) = (PartnerId::new(), PartnerId::new());

        let actions: Vec<CareAction> = plan
            .iter()
            .map(|(minutes, kind, first)| {
                let actor = if *first { a } else { b };
                CareAction::new(pet.id, actor, *kind, t0() + Duration::minutes(*minutes))
            })
            .collect();

        // One device got them in order, the other rotated and with duplicates
        let mut forward = CareLog::new();
        forward.merge(actions.clone());

        let mut shuffled = actions.clone();
        let len = shuffled.len();
        shuffled.rotate_left(rotate % len);
        shuffled.reverse();
        let mut other = CareLog::new();
        other.merge(shuffled.iter().step_by(2).cloned());
        other.merge(shuffled);

        let forward_ids: Vec<_> = forward.iter().map(|x| x.id).collect();
        let other_ids: Vec<_> = other.iter().map(|x| x.id).collect();
        prop_assert_eq!(&forward_ids, &other_ids);

        let left = replay(&pet, &forward, &config);
        let right = replay(&pet, &other, &config);
        prop_assert_eq!(left.stats, right.stats);
        prop_assert_eq!(left.personality, right.personality);
        prop_assert_eq!(left.experience, config.experience_per_action * actions.len() as u64);

        let now = t0() + Duration::days(14);
        prop_assert_eq!(streak::from_log(&forward, now), streak::from_log(&other, now));
    }

    #[test]
    fn streak_current_never_exceeds_longest(days in prop::collection::vec(0i64..60, 0..30), today in 0i64..70) {
        let stamps = days.iter().map(|d| t0() + Duration::days(*d) + Duration::hours(12));
        let info = streak::calculate(stamps, (t0() + Duration::days(today)).date_naive());
        prop_assert!(info.current_streak <= info.longest_streak);
        prop_assert!(info.longest_streak as usize <= info.care_days());
    }
}
