//! Property tests for the timing primitives
//!
//! Scheduler ordering, the stat/multiplier formulas, aiming tiers and the
//! burst round cap, checked over generated inputs.

use proptest::prelude::*;

use fireline::combat::aiming::bonus_tier;
use fireline::combat::modifiers::{
    reload_speed_multiplier, scale_ticks, stat_to_modifier, weapon_ready_speed_multiplier,
};
use fireline::combat::{
    reload, transition, Combatant, EffectLog, FiringMode, ReloadProgress, WeaponCatalog,
};
use fireline::core::{CombatConfig, EntityId, FactionId, Tick, Vec2};
use fireline::simulation::{Command, Scheduler};
use fireline::SimulationContext;

proptest! {
    #[test]
    fn prop_scheduler_drains_in_due_then_insertion_order(
        dues in prop::collection::vec(0u64..200, 1..60),
        start in 0u64..50,
    ) {
        let mut scheduler = Scheduler::new();
        scheduler.advance_to(start);
        for (i, due) in dues.iter().enumerate() {
            let handle = scheduler.schedule(*due, EntityId(i as u32), Command::Retarget);
            prop_assert!(handle.due > start);
            prop_assert_eq!(handle.due, (*due).max(start + 1));
        }

        let mut drained = Vec::new();
        while let Some(action) = scheduler.pop_due(Tick::MAX) {
            drained.push((action.due, action.sequence));
        }
        prop_assert_eq!(drained.len(), dues.len());
        prop_assert!(drained.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_stat_modifier_bounded_and_monotonic(stat in -50i32..200) {
        let modifier = stat_to_modifier(stat);
        prop_assert!((-20..=20).contains(&modifier));
        prop_assert!(stat_to_modifier(stat + 1) >= modifier);
    }

    #[test]
    fn prop_faster_reflexes_never_slow_preparation(
        reflexes in -20i32..20,
        quickdraw in 0u8..5,
        base in 0u64..500,
    ) {
        let slower = weapon_ready_speed_multiplier(reflexes, quickdraw);
        let faster = weapon_ready_speed_multiplier(reflexes + 1, quickdraw);
        prop_assert!(faster <= slower);
        prop_assert!(scale_ticks(base, faster) <= scale_ticks(base, slower));
        prop_assert!(reload_speed_multiplier(reflexes + 1) <= reload_speed_multiplier(reflexes));
    }

    #[test]
    fn prop_scale_ticks_never_negative(base in 0u64..10_000, multiplier in -3.0f64..3.0) {
        let scaled = scale_ticks(base, multiplier);
        if multiplier <= 0.0 {
            prop_assert_eq!(scaled, 0);
        } else {
            prop_assert!(scaled as f64 <= base as f64 * multiplier + 0.5);
        }
    }

    #[test]
    fn prop_aiming_tier_grows_with_time(
        accumulated in 0u64..1000,
        extra in 0u64..200,
        base in 1u64..120,
        multiplier in 0.5f64..2.0,
        from_hip: bool,
        very_careful: bool,
    ) {
        let earlier = bonus_tier(accumulated, base, multiplier, from_hip, very_careful);
        let later = bonus_tier(accumulated + extra, base, multiplier, from_hip, very_careful);
        prop_assert!(later >= earlier);
        if from_hip {
            prop_assert!(later <= fireline::combat::AimingBonusTier::Normal);
        }
        if !very_careful {
            prop_assert!(later < fireline::combat::AimingBonusTier::VeryCareful);
        }
    }

    #[test]
    fn prop_reload_fraction_within_unit_range(
        started in 0u64..1000,
        span in 0u64..500,
        now in 0u64..2000,
    ) {
        let progress = ReloadProgress { started_at: started, completes_at: started + span };
        let fraction = progress.fraction(now);
        prop_assert!((0.0..=1.0).contains(&fraction));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_burst_never_exceeds_size_or_ammo(rounds in 1u32..=20) {
        let log = EffectLog::new();
        let mut ctx = SimulationContext::new(CombatConfig::default()).with_effects(log.clone());
        let catalog = WeaponCatalog::with_defaults();

        let mut smg = catalog.instantiate("thompson").expect("thompson");
        smg.enter_state("aiming").expect("aiming state");
        smg.set_ammunition(rounds);
        prop_assert_eq!(smg.firing_mode(), FiringMode::Burst);
        let shooter = ctx.add_combatant(
            Combatant::new(EntityId(1), "Gunner", FactionId(0)).with_ranged_weapon(smg),
        );
        let target = ctx.add_combatant(
            Combatant::new(EntityId(2), "Target", FactionId(1)).with_position(Vec2::new(70.0, 0.0)),
        );

        transition::start_attack_sequence(&mut ctx, shooter, Some(target)).expect("attack");
        ctx.run_until(200);

        let shots = log.shots_by(shooter);
        prop_assert_eq!(shots.len() as u32, rounds.min(3));
        prop_assert!(shots.iter().all(|s| s.burst_shot <= 3));
        prop_assert!(shots.iter().skip(1).all(|s| s.burst_penalty));
    }

    #[test]
    fn prop_single_round_reload_adds_one_round_per_step(loaded in 0u32..=6) {
        let mut ctx = SimulationContext::new(CombatConfig::default());
        let mut colt = WeaponCatalog::with_defaults().instantiate("colt_peacemaker").expect("colt");
        colt.enter_state("ready").expect("ready state");
        colt.set_ammunition(loaded);
        let id = ctx.add_combatant(Combatant::new(EntityId(1), "Loader", FactionId(0)).with_ranged_weapon(colt));

        let started = reload::start_reload(&mut ctx, id).expect("reload");
        prop_assert_eq!(started, loaded < 6);

        let ammo = |ctx: &SimulationContext| {
            ctx.combatant(id).and_then(|c| c.ranged_weapon.as_ref()).map_or(0, |w| w.ammunition())
        };
        let mut previous = ammo(&ctx);
        for _ in 0..400 {
            ctx.step();
            let now = ammo(&ctx);
            prop_assert!(now >= previous && now - previous <= 1);
            prop_assert!(now <= 6);
            previous = now;
        }
        prop_assert_eq!(previous, 6);
        prop_assert!(!reload::is_reloading(&ctx, id));
    }
}
