//! Body items (apples, cacti), pickups (bombs, shields) and hunger
//!
//! Items live in the world, deactivate on collection and respawn later at a
//! fresh seeded track-relative position. Hunger is the clock that drives AI
//! apple-seeking; a starving racer starts shedding segments.

use glam::Vec2;
use rand::Rng;

use super::body::{apply_body_segment_delta, SegmentChangeReason};
use super::state::{BodyItem, BodyItemKind, EffectKind, Pickup, PickupKind, RaceWorld};
use crate::consts::*;
use crate::mod1;

/// Pick a fresh position on the road surface. Apples additionally stay clear
/// of the start line so the AI never parks on checkpoint 0.
pub fn randomize_item_position(world: &mut RaceWorld, avoid_start_line: bool) -> Vec2 {
    let start = world.track.checkpoints.first().copied();
    for _ in 0..12 {
        let t = mod1(world.rng.random_range(0.0..1.0));
        let lateral_limit = (world.track.road_width * 0.8).max(1.0);
        let lateral = world.rng.random_range(-lateral_limit..lateral_limit);
        let Some(sample) = world.track.sample_track(t) else {
            break;
        };
        let normal = Vec2::new(-sample.tangent.y, sample.tangent.x);
        let pos = sample.point + normal * lateral;
        if avoid_start_line {
            if let Some(start) = start {
                if (pos - start).length() < APPLE_STARTLINE_AVOID_RADIUS {
                    continue;
                }
            }
        }
        return pos;
    }
    // Degenerate track or unlucky rolls: fall back to the first point
    world.track.points.first().copied().unwrap_or(Vec2::ZERO)
}

/// Seed the initial item set for a race
pub fn spawn_items(world: &mut RaceWorld, apples: u32, cacti: u32, bombs: u32, shields: u32) {
    for _ in 0..apples {
        let pos = randomize_item_position(world, true);
        world.body_items.push(BodyItem {
            pos,
            kind: BodyItemKind::Apple,
            radius: APPLE_RADIUS,
            active: true,
            respawn_at_ms: 0.0,
        });
    }
    for _ in 0..cacti {
        let pos = randomize_item_position(world, false);
        world.body_items.push(BodyItem {
            pos,
            kind: BodyItemKind::Cactus,
            radius: CACTUS_RADIUS,
            active: true,
            respawn_at_ms: 0.0,
        });
    }
    for _ in 0..bombs {
        let pos = randomize_item_position(world, false);
        world.pickups.push(Pickup {
            pos,
            kind: PickupKind::Bomb,
            active: true,
            respawn_at_ms: 0.0,
        });
    }
    for _ in 0..shields {
        let pos = randomize_item_position(world, false);
        world.pickups.push(Pickup {
            pos,
            kind: PickupKind::Shield,
            active: true,
            respawn_at_ms: 0.0,
        });
    }
}

/// Respawn collected body items whose timer elapsed
pub fn update_body_items(world: &mut RaceWorld, now_ms: f64) {
    for i in 0..world.body_items.len() {
        let item = &world.body_items[i];
        if item.active || now_ms < item.respawn_at_ms {
            continue;
        }
        let avoid_start = item.kind == BodyItemKind::Apple;
        let pos = randomize_item_position(world, avoid_start);
        let item = &mut world.body_items[i];
        item.pos = pos;
        item.active = true;
        log::debug!("respawned {:?} at ({:.0}, {:.0})", item.kind, pos.x, pos.y);
    }
}

/// Respawn collected pickups whose timer elapsed
pub fn update_pickups(world: &mut RaceWorld, now_ms: f64) {
    for i in 0..world.pickups.len() {
        let pickup = &world.pickups[i];
        if pickup.active || now_ms < pickup.respawn_at_ms {
            continue;
        }
        let pos = randomize_item_position(world, false);
        let pickup = &mut world.pickups[i];
        pickup.pos = pos;
        pickup.active = true;
        log::debug!("respawned {:?} at ({:.0}, {:.0})", pickup.kind, pos.x, pos.y);
    }
}

/// Advance every unfinished racer's hunger clock; starvation sheds segments
pub fn update_racer_hunger(world: &mut RaceWorld, now_ms: f64) {
    for racer in &mut world.racers {
        if racer.finished {
            continue;
        }
        if racer.hunger_next_step_at_ms <= 0.0 {
            racer.hunger_next_step_at_ms = now_ms + HUNGER_STEP_INTERVAL_MS;
            continue;
        }
        if now_ms < racer.hunger_next_step_at_ms {
            continue;
        }
        racer.hunger_next_step_at_ms = now_ms + HUNGER_STEP_INTERVAL_MS;
        racer.exhaustion_steps = (racer.exhaustion_steps + 1).min(HUNGER_SHED_STEPS);
        if racer.exhaustion_steps >= HUNGER_SHED_STEPS {
            apply_body_segment_delta(racer, -1, now_ms, SegmentChangeReason::Starve);
        }
    }
}

/// Head-overlap collection of apples and cacti
pub fn check_body_item_collection(world: &mut RaceWorld, now_ms: f64) {
    for item_idx in 0..world.body_items.len() {
        if !world.body_items[item_idx].active {
            continue;
        }
        let (item_pos, item_radius, item_kind) = {
            let item = &world.body_items[item_idx];
            (item.pos, item.radius, item.kind)
        };
        let limit = HEAD_RADIUS + item_radius;

        for racer_idx in 0..world.racers.len() {
            let racer = &world.racers[racer_idx];
            if racer.finished || (racer.pos - item_pos).length_squared() > limit * limit {
                continue;
            }
            let racer = &mut world.racers[racer_idx];
            match item_kind {
                BodyItemKind::Apple => {
                    apply_body_segment_delta(racer, 1, now_ms, SegmentChangeReason::Apple);
                    racer.exhaustion_steps = 0;
                    racer.hunger_next_step_at_ms = now_ms + HUNGER_STEP_INTERVAL_MS;
                }
                BodyItemKind::Cactus => {
                    // Contact always costs the item; the shrink may be denied
                    // by the floor
                    apply_body_segment_delta(racer, -1, now_ms, SegmentChangeReason::Cactus);
                }
            }
            let item = &mut world.body_items[item_idx];
            item.active = false;
            item.respawn_at_ms = now_ms + ITEM_RESPAWN_MS;
            break;
        }
    }
}

/// Head-overlap collection of bombs and shields
pub fn check_pickup_collection(world: &mut RaceWorld, now_ms: f64) {
    for pickup_idx in 0..world.pickups.len() {
        if !world.pickups[pickup_idx].active {
            continue;
        }
        let (pickup_pos, pickup_kind) = {
            let pickup = &world.pickups[pickup_idx];
            (pickup.pos, pickup.kind)
        };
        let limit = HEAD_RADIUS + PICKUP_RADIUS;

        for racer_idx in 0..world.racers.len() {
            let racer = &world.racers[racer_idx];
            if racer.finished || (racer.pos - pickup_pos).length_squared() > limit * limit {
                continue;
            }
            let racer = &mut world.racers[racer_idx];
            match pickup_kind {
                PickupKind::Bomb => {
                    racer.add_effect(
                        EffectKind::BombSlow,
                        BOMB_SLOW_DURATION_MS,
                        now_ms,
                        BOMB_SLOW_MUL,
                    );
                }
                PickupKind::Shield => {
                    racer.shield_charges += 1;
                    racer.add_effect(EffectKind::Shield, SHIELD_EFFECT_MS, now_ms, 1.0);
                }
            }
            let pickup = &mut world.pickups[pickup_idx];
            pickup.active = false;
            pickup.respawn_at_ms = now_ms + ITEM_RESPAWN_MS;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{RacerKind, RacerProfile};
    use crate::sim::track::Track;

    fn test_world() -> RaceWorld {
        let track = Track::new(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1000.0, 0.0),
                Vec2::new(1000.0, 600.0),
                Vec2::new(0.0, 600.0),
            ],
            40.0,
            70.0,
            vec![Vec2::new(0.0, 0.0), Vec2::new(1000.0, 600.0)],
        );
        let mut world = RaceWorld::new(track, 3, 42, 0.0);
        world.add_racer(
            RacerKind::Default,
            RacerProfile::default(),
            Vec2::new(500.0, 0.0),
            0.0,
            false,
            0xffffff,
        );
        world
    }

    #[test]
    fn test_apple_grows_and_feeds() {
        let mut world = test_world();
        world.racers[0].exhaustion_steps = 4;
        world.body_items.push(BodyItem {
            pos: Vec2::new(500.0, 2.0),
            kind: BodyItemKind::Apple,
            radius: APPLE_RADIUS,
            active: true,
            respawn_at_ms: 0.0,
        });
        let before = world.racers[0].segment_count;

        check_body_item_collection(&mut world, 1000.0);

        assert_eq!(world.racers[0].segment_count, before + 1);
        assert_eq!(world.racers[0].exhaustion_steps, 0);
        assert!(!world.body_items[0].active);
        assert!(world.body_items[0].respawn_at_ms > 1000.0);
    }

    #[test]
    fn test_cactus_respects_floor_but_is_consumed() {
        let mut world = test_world();
        world.racers[0].segment_count = MIN_BODY_SEGMENTS;
        world.body_items.push(BodyItem {
            pos: Vec2::new(500.0, 2.0),
            kind: BodyItemKind::Cactus,
            radius: CACTUS_RADIUS,
            active: true,
            respawn_at_ms: 0.0,
        });

        check_body_item_collection(&mut world, 1000.0);

        assert_eq!(world.racers[0].segment_count, MIN_BODY_SEGMENTS);
        assert!(!world.body_items[0].active);
    }

    #[test]
    fn test_bomb_applies_slow_and_shield_grants_charge() {
        let mut world = test_world();
        world.pickups.push(Pickup {
            pos: Vec2::new(500.0, 2.0),
            kind: PickupKind::Bomb,
            active: true,
            respawn_at_ms: 0.0,
        });
        check_pickup_collection(&mut world, 1000.0);
        assert!(world.racers[0].has_effect(EffectKind::BombSlow));

        world.pickups.push(Pickup {
            pos: world.racers[0].pos,
            kind: PickupKind::Shield,
            active: true,
            respawn_at_ms: 0.0,
        });
        check_pickup_collection(&mut world, 1000.0);
        assert_eq!(world.racers[0].shield_charges, 1);
        assert!(world.racers[0].has_effect(EffectKind::Shield));
    }

    #[test]
    fn test_hunger_steps_and_starvation_shed() {
        let mut world = test_world();
        world.racers[0].segment_count = MIN_BODY_SEGMENTS + 2;

        // First call only arms the clock
        update_racer_hunger(&mut world, 0.0);
        assert_eq!(world.racers[0].exhaustion_steps, 0);

        let mut now = 0.0;
        for _ in 0..HUNGER_SHED_STEPS + 2 {
            now += HUNGER_STEP_INTERVAL_MS;
            update_racer_hunger(&mut world, now);
        }
        assert_eq!(world.racers[0].exhaustion_steps, HUNGER_SHED_STEPS);
        assert!(world.racers[0].segment_count < MIN_BODY_SEGMENTS + 2);
        assert!(world.racers[0].segment_count >= MIN_BODY_SEGMENTS);
    }

    #[test]
    fn test_respawn_waits_for_timer_and_avoids_start_line() {
        let mut world = test_world();
        world.body_items.push(BodyItem {
            pos: Vec2::new(500.0, 2.0),
            kind: BodyItemKind::Apple,
            radius: APPLE_RADIUS,
            active: false,
            respawn_at_ms: 5000.0,
        });

        update_body_items(&mut world, 4000.0);
        assert!(!world.body_items[0].active);

        update_body_items(&mut world, 5001.0);
        assert!(world.body_items[0].active);
        let start = world.track.checkpoints[0];
        assert!((world.body_items[0].pos - start).length() >= APPLE_STARTLINE_AVOID_RADIUS);
    }
}
