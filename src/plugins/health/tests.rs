#![cfg(test)]

use super::*;

use bevy::ecs::message::Messages;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::test_utils::run_system_once;

fn world_with_messages() -> World {
    let mut world = World::new();
    world.init_resource::<Messages<DamageMessage>>();
    world.init_resource::<Messages<HealMessage>>();
    world.init_resource::<Messages<HealthChanged>>();
    world.init_resource::<Messages<Died>>();
    world
}

fn drain<M: Message + Clone>(world: &mut World) -> Vec<M> {
    world.resource_mut::<Messages<M>>().drain().collect()
}

// -----------------------------------------------------------------------------
// Model invariants
// -----------------------------------------------------------------------------

#[test]
fn new_health_starts_full() {
    let h = Health::new(80.0);
    assert_eq!(h.current(), 80.0);
    assert_eq!(h.max(), 80.0);
    assert!(!h.is_dead());
}

#[test]
fn damage_clamps_at_zero_and_kills() {
    let mut h = Health::new(10.0);
    assert_eq!(h.take_damage(4.0), HealthOutcome::Changed);
    assert_eq!(h.current(), 6.0);

    assert_eq!(h.take_damage(100.0), HealthOutcome::Died);
    assert_eq!(h.current(), 0.0);
    assert!(h.is_dead());
}

#[test]
fn death_is_terminal_and_single_fire() {
    let mut h = Health::new(5.0);
    assert_eq!(h.take_damage(5.0), HealthOutcome::Died);

    // Every later mutation is a no-op; `Died` never fires again.
    assert_eq!(h.take_damage(1.0), HealthOutcome::Unchanged);
    assert_eq!(h.heal(100.0), HealthOutcome::Unchanged);
    assert_eq!(h.set(3.0), HealthOutcome::Unchanged);
    assert_eq!(h.current(), 0.0);
    assert!(h.is_dead());
}

#[test]
fn heal_clamps_at_max() {
    let mut h = Health::new(50.0);
    h.take_damage(10.0);
    assert_eq!(h.heal(999.0), HealthOutcome::Changed);
    assert_eq!(h.current(), 50.0);
}

#[test]
fn set_clamps_and_can_kill() {
    let mut h = Health::new(50.0);
    h.set(200.0);
    assert_eq!(h.current(), 50.0);

    h.set(-3.0);
    assert_eq!(h.current(), 0.0);
    assert!(h.is_dead());
}

#[test]
fn non_positive_amounts_are_rejected_by_the_model() {
    let mut h = Health::new(50.0);
    assert_eq!(h.take_damage(-5.0), HealthOutcome::Unchanged);
    assert_eq!(h.heal(0.0), HealthOutcome::Unchanged);
    assert_eq!(h.current(), 50.0);
}

#[test]
fn scale_max_refills_and_guards_sign() {
    let mut h = Health::new(100.0);
    h.scale_max(1.5);
    assert_eq!(h.max(), 150.0);
    assert_eq!(h.current(), 150.0);

    h.scale_max(-2.0);
    assert_eq!(h.max(), 150.0);
}

/// Invariant holds across arbitrary op sequences: `0 <= current <= max`.
#[test]
fn invariant_holds_under_random_op_sequences() {
    let mut rng = StdRng::seed_from_u64(0xDEAD);

    for _ in 0..200 {
        let mut h = Health::new(rng.gen_range(1.0..500.0));
        for _ in 0..64 {
            let amount = rng.gen_range(-50.0..150.0);
            match rng.gen_range(0..3) {
                0 => {
                    h.take_damage(amount);
                }
                1 => {
                    h.heal(amount);
                }
                _ => {
                    h.set(amount);
                }
            }
            assert!(h.current() >= 0.0);
            assert!(h.current() <= h.max());
            if h.is_dead() {
                assert_eq!(h.current(), 0.0);
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Message pipeline
// -----------------------------------------------------------------------------

#[test]
fn apply_damage_emits_changed_and_died() {
    let mut world = world_with_messages();
    let e = world.spawn(Health::new(10.0)).id();

    world.write_message(DamageMessage { target: e, amount: 4.0 });
    run_system_once(&mut world, apply_damage);

    let changed = drain::<HealthChanged>(&mut world);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].current, 6.0);
    assert!(drain::<Died>(&mut world).is_empty());

    world.write_message(DamageMessage { target: e, amount: 10.0 });
    run_system_once(&mut world, apply_damage);

    let died = drain::<Died>(&mut world);
    assert_eq!(died.len(), 1);
    assert_eq!(died[0].entity, e);
}

#[test]
fn dead_entity_absorbs_further_damage_silently() {
    let mut world = world_with_messages();
    let e = world.spawn(Health::new(5.0)).id();

    world.write_message(DamageMessage { target: e, amount: 5.0 });
    run_system_once(&mut world, apply_damage);
    assert_eq!(drain::<Died>(&mut world).len(), 1);

    world.write_message(DamageMessage { target: e, amount: 5.0 });
    run_system_once(&mut world, apply_damage);

    assert!(drain::<Died>(&mut world).is_empty());
    assert!(drain::<HealthChanged>(&mut world).is_empty());
}

#[test]
fn negative_damage_is_rejected_not_applied_as_heal() {
    let mut world = world_with_messages();
    let e = world.spawn(Health::new(10.0)).id();
    world.entity_mut(e).get_mut::<Health>().unwrap().take_damage(4.0);

    world.write_message(DamageMessage { target: e, amount: -3.0 });
    run_system_once(&mut world, apply_damage);

    assert!(drain::<HealthChanged>(&mut world).is_empty());
    assert_eq!(world.entity(e).get::<Health>().unwrap().current(), 6.0);
}

#[test]
fn damage_to_missing_target_is_ignored() {
    let mut world = world_with_messages();
    let e = world.spawn(Health::new(10.0)).id();
    world.despawn(e);

    world.write_message(DamageMessage { target: e, amount: 3.0 });
    run_system_once(&mut world, apply_damage);

    assert!(drain::<HealthChanged>(&mut world).is_empty());
}

#[test]
fn apply_heals_clamps_and_notifies() {
    let mut world = world_with_messages();
    let e = world.spawn(Health::new(20.0)).id();
    world.entity_mut(e).get_mut::<Health>().unwrap().take_damage(15.0);

    world.write_message(HealMessage { target: e, amount: 50.0 });
    run_system_once(&mut world, apply_heals);

    let changed = drain::<HealthChanged>(&mut world);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].current, 20.0);
}
