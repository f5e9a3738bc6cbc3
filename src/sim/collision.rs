//! Racer-vs-racer contact resolution
//!
//! Two layers run after kinematics each tick: head-vs-head circle separation
//! with type-aware penalties, and body-crossing rules where a head overlaps
//! another racer's trailing segments. Both snap the newest history sample to
//! the corrected pose so derived bodies don't kink at the neck.

use std::f32::consts::FRAC_PI_2;

use super::body::{align_racer_heading_to_motion, apply_body_segment_delta, SegmentChangeReason};
use super::state::{EffectKind, Racer, RaceWorld, RacerKind};
use crate::consts::*;
use crate::{heading_vec, normalize_angle, shortest_angle};

/// Speed multiplier for a non-bully taking a head-on impact
const IMPACT_SLOW_MUL: f32 = 0.72;
/// Milder impact penalty for never-stop racers
const IMPACT_SLOW_MUL_NEVER_STOP: f32 = 0.9;

/// Separate overlapping racer heads and apply impact penalties
pub fn resolve_racer_collisions(world: &mut RaceWorld, now_ms: f64) {
    let count = world.racers.len();
    for i in 0..count {
        for j in (i + 1)..count {
            let (left, right) = world.racers.split_at_mut(j);
            let a = &mut left[i];
            let b = &mut right[0];
            if a.finished || b.finished {
                continue;
            }
            if a.in_unstuck_grace(now_ms) || b.in_unstuck_grace(now_ms) {
                continue;
            }

            let limit = RACER_COLLISION_RADIUS * 2.0;
            let delta = b.pos - a.pos;
            let dist = delta.length();
            if dist >= limit {
                continue;
            }

            // Coincident heads get pushed apart sideways
            let normal = if dist > 1e-4 {
                delta / dist
            } else {
                heading_vec(a.heading + FRAC_PI_2)
            };
            let half = (limit - dist) * 0.5;
            a.pos -= normal * half;
            b.pos += normal * half;

            if a.kind == RacerKind::Bully && b.kind != RacerKind::Bully {
                b.pos += normal * BULLY_PUSH_DISTANCE;
            }
            if b.kind == RacerKind::Bully && a.kind != RacerKind::Bully {
                a.pos -= normal * BULLY_PUSH_DISTANCE;
            }

            // The impact cooldown is shared across the pair: while either
            // side is still cooling down, neither takes a fresh penalty
            let cooling = now_ms < a.impact_until_ms || now_ms < b.impact_until_ms;
            if !cooling {
                a.impact_until_ms = now_ms + IMPACT_COOLDOWN_MS;
                b.impact_until_ms = now_ms + IMPACT_COOLDOWN_MS;
                apply_impact_penalty(a);
                apply_impact_penalty(b);
            }

            snap_history_to_pose(a);
            snap_history_to_pose(b);
        }
    }
}

/// Bullies shrug impacts off entirely; everyone else pays the speed
/// penalty, shield charge first. Cooldown gating happens at the pair level
/// in `resolve_racer_collisions`.
fn apply_impact_penalty(racer: &mut Racer) {
    if racer.kind == RacerKind::Bully {
        return;
    }

    if racer.shield_charges > 0 {
        racer.shield_charges -= 1;
        racer.remove_effect(EffectKind::Shield);
        log::debug!("racer {} shield absorbed impact", racer.id);
        return;
    }
    let mul = if racer.profile.never_stop {
        IMPACT_SLOW_MUL_NEVER_STOP
    } else {
        IMPACT_SLOW_MUL
    };
    racer.speed *= mul;
    racer.ensure_always_move_speed();
}

fn snap_history_to_pose(racer: &mut Racer) {
    if let Some(newest) = racer.history.first_mut() {
        newest.pos = racer.pos;
        newest.heading = racer.heading;
    }
    align_racer_heading_to_motion(racer, 0.02, 18.0);
}

/// Body-crossing rules: what happens when a head overlaps another racer's
/// trailing segments. Suspended globally right after the start so the packed
/// grid can spread out, and per racer during unstuck grace.
pub fn apply_body_crossing_rules(world: &mut RaceWorld, now_ms: f64) {
    if now_ms < world.body_crossing_grace_until_ms {
        return;
    }
    let count = world.racers.len();
    for i in 0..count {
        if world.racers[i].finished || world.racers[i].in_unstuck_grace(now_ms) {
            continue;
        }
        let mut crossed = false;
        for j in 0..count {
            if i == j || crossed {
                continue;
            }
            if world.racers[j].finished || world.racers[j].in_unstuck_grace(now_ms) {
                continue;
            }

            try_tail_bite(world, i, j, now_ms);

            let head_pos = world.racers[i].pos;
            let hit = world.racers[j]
                .segments
                .iter()
                .find(|seg| {
                    let limit = HEAD_RADIUS + seg.radius;
                    (head_pos - seg.pos).length_squared() <= limit * limit
                })
                .map(|seg| (seg.pos, seg.heading, seg.radius));
            let Some((seg_pos, seg_heading, seg_radius)) = hit else {
                continue;
            };

            apply_crossing_effect(world, i, seg_pos, seg_heading, seg_radius, now_ms);
            // One blocking body per racer per tick
            crossed = true;
        }
    }
}

/// Tricksters bite the tail segment off a racer they catch up to
fn try_tail_bite(world: &mut RaceWorld, biter_idx: usize, victim_idx: usize, now_ms: f64) {
    let biter = &world.racers[biter_idx];
    if biter.kind != RacerKind::Trickster || now_ms < biter.tail_bite_until_ms {
        return;
    }
    let head_pos = biter.pos;
    let Some((tail_pos, tail_radius)) = world.racers[victim_idx]
        .tail_segment()
        .map(|t| (t.pos, t.radius))
    else {
        return;
    };
    let range = HEAD_RADIUS + tail_radius + TAIL_BITE_RANGE_PAD;
    if (head_pos - tail_pos).length_squared() > range * range {
        return;
    }
    let bitten = apply_body_segment_delta(
        &mut world.racers[victim_idx],
        -1,
        now_ms,
        SegmentChangeReason::Bite,
    );
    if bitten {
        world.racers[biter_idx].tail_bite_until_ms = now_ms + TAIL_BITE_COOLDOWN_MS;
    }
}

fn apply_crossing_effect(
    world: &mut RaceWorld,
    racer_idx: usize,
    seg_pos: glam::Vec2,
    seg_heading: f32,
    seg_radius: f32,
    now_ms: f64,
) {
    let kind = world.racers[racer_idx].kind;
    match kind {
        RacerKind::Speedster => {
            // Shoulder around the block instead of bogging down on it
            let aim = world.racers[racer_idx]
                .last_projection
                .and_then(|proj| world.track.sample_track(proj.t_norm + 0.011))
                .map(|sample| sample.point);

            let racer = &mut world.racers[racer_idx];
            let away = racer.pos - seg_pos;
            let away_dist = away.length();
            let away_dir = if away_dist > 1e-4 {
                away / away_dist
            } else {
                heading_vec(racer.heading + FRAC_PI_2)
            };
            let clearance = HEAD_RADIUS + seg_radius + (SPEEDSTER_BODY_BLOCK_PUSH * 0.5).max(2.0);
            let shift = (clearance - away_dist).clamp(0.0, SPEEDSTER_BLOCK_MAX_SHIFT);
            racer.pos += away_dir * shift;

            let sign = if shortest_angle(racer.heading, seg_heading) >= 0.0 {
                1.0
            } else {
                -1.0
            };
            racer.heading =
                normalize_angle(racer.heading + SPEEDSTER_BLOCK_EXTRA_TURN * sign * 0.5);
            if let Some(aim) = aim {
                let bearing = (aim - racer.pos).to_angle();
                racer.heading = normalize_angle(
                    racer.heading + shortest_angle(racer.heading, bearing) * 0.55,
                );
            }
            let step = SPEEDSTER_BLOCK_FORWARD_STEP.min(SPEEDSTER_BLOCK_NUDGE + 1.5);
            racer.pos += heading_vec(racer.heading) * step;

            if now_ms >= racer.next_body_cross_at_ms {
                racer.next_body_cross_at_ms = now_ms + BODY_CROSSING_EFFECT_COOLDOWN_MS;
                racer.speed *= 0.96;
                racer.ensure_always_move_speed();
            }
            snap_history_to_pose(racer);
        }
        RacerKind::CrossAccel => {
            let racer = &mut world.racers[racer_idx];
            if now_ms >= racer.next_body_cross_at_ms {
                racer.next_body_cross_at_ms = now_ms + BODY_CROSSING_EFFECT_COOLDOWN_MS;
                racer.speed = (racer.speed * CROSS_ACCEL_BOOST_MUL).min(racer.speed_ceiling());
                racer.ensure_always_move_speed();
            }
        }
        _ => {
            let racer = &mut world.racers[racer_idx];
            if now_ms >= racer.next_body_cross_at_ms {
                racer.next_body_cross_at_ms = now_ms + BODY_CROSSING_EFFECT_COOLDOWN_MS;
                racer.speed *= BODY_CROSS_SLOWDOWN_MUL;
                racer.ensure_always_move_speed();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::rebuild_segments;
    use crate::sim::state::{HistorySample, RacerProfile};
    use crate::sim::track::Track;
    use glam::Vec2;

    const NOW: f64 = 60_000.0;

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
            vec![Vec2::new(0.0, 0.0)],
        );
        // now=0 in new() so the start grace is long over by NOW
        RaceWorld::new(track, 3, 11, 0.0)
    }

    fn add(world: &mut RaceWorld, kind: RacerKind, pos: Vec2) -> usize {
        world.add_racer(kind, RacerProfile::default(), pos, 0.0, false, 0xffffff);
        let idx = world.racers.len() - 1;
        world.racers[idx].speed = 100.0;
        idx
    }

    fn give_straight_body(racer: &mut Racer, head: Vec2, count: u32) {
        racer.pos = head;
        racer.history = (0..60)
            .map(|i| HistorySample {
                pos: Vec2::new(head.x - i as f32 * 5.0, head.y),
                heading: 0.0,
            })
            .collect();
        racer.segment_count = count;
        rebuild_segments(racer);
    }

    #[test]
    fn test_overlap_separates_and_penalizes_both() {
        let mut world = test_world();
        let a = add(&mut world, RacerKind::Default, Vec2::new(500.0, 0.0));
        let b = add(&mut world, RacerKind::Default, Vec2::new(510.0, 0.0));

        resolve_racer_collisions(&mut world, NOW);

        let gap = (world.racers[b].pos - world.racers[a].pos).length();
        assert!((gap - RACER_COLLISION_RADIUS * 2.0).abs() < 1e-3);
        assert!(world.racers[a].speed < 100.0);
        assert!(world.racers[b].speed < 100.0);
        assert!(world.racers[a].impact_until_ms > NOW);

        // Within the impact cooldown only separation repeats, not the penalty
        let speed_after = world.racers[a].speed;
        world.racers[b].pos = world.racers[a].pos + Vec2::new(10.0, 0.0);
        resolve_racer_collisions(&mut world, NOW + IMPACT_COOLDOWN_MS * 0.5);
        assert!((world.racers[a].speed - speed_after).abs() < 1e-3);
    }

    #[test]
    fn test_pair_cooldown_spares_fresh_rammer() {
        let mut world = test_world();
        let cooling = add(&mut world, RacerKind::Default, Vec2::new(500.0, 0.0));
        let rammer = add(&mut world, RacerKind::Default, Vec2::new(510.0, 0.0));
        // One side is still cooling down from an earlier impact
        world.racers[cooling].impact_until_ms = NOW + IMPACT_COOLDOWN_MS * 0.5;

        resolve_racer_collisions(&mut world, NOW);

        // Separation still happens but neither side takes a penalty, and the
        // fresh side's cooldown is not armed
        let gap = (world.racers[rammer].pos - world.racers[cooling].pos).length();
        assert!((gap - RACER_COLLISION_RADIUS * 2.0).abs() < 1e-3);
        assert!((world.racers[cooling].speed - 100.0).abs() < 1e-3);
        assert!((world.racers[rammer].speed - 100.0).abs() < 1e-3);
        assert_eq!(world.racers[rammer].impact_until_ms, 0.0);
    }

    #[test]
    fn test_bully_pushes_and_takes_no_penalty() {
        let mut world = test_world();
        let bully = add(&mut world, RacerKind::Bully, Vec2::new(500.0, 0.0));
        let victim = add(&mut world, RacerKind::Default, Vec2::new(510.0, 0.0));

        resolve_racer_collisions(&mut world, NOW);

        assert!((world.racers[bully].speed - 100.0).abs() < 1e-3);
        assert!(world.racers[victim].speed < 100.0);
        let gap = (world.racers[victim].pos - world.racers[bully].pos).length();
        assert!(gap >= RACER_COLLISION_RADIUS * 2.0 + BULLY_PUSH_DISTANCE - 1e-3);
    }

    #[test]
    fn test_shield_absorbs_impact_penalty() {
        let mut world = test_world();
        let a = add(&mut world, RacerKind::Default, Vec2::new(500.0, 0.0));
        let _b = add(&mut world, RacerKind::Default, Vec2::new(510.0, 0.0));
        world.racers[a].shield_charges = 1;
        world.racers[a].add_effect(EffectKind::Shield, 1e9, 0.0, 1.0);

        resolve_racer_collisions(&mut world, NOW);

        assert!((world.racers[a].speed - 100.0).abs() < 1e-3);
        assert_eq!(world.racers[a].shield_charges, 0);
        assert!(!world.racers[a].has_effect(EffectKind::Shield));
    }

    #[test]
    fn test_unstuck_grace_skips_resolution() {
        let mut world = test_world();
        let a = add(&mut world, RacerKind::Default, Vec2::new(500.0, 0.0));
        let b = add(&mut world, RacerKind::Default, Vec2::new(510.0, 0.0));
        world.racers[a].unstuck_until_ms = NOW + 100.0;

        resolve_racer_collisions(&mut world, NOW);

        assert_eq!(world.racers[a].pos, Vec2::new(500.0, 0.0));
        assert_eq!(world.racers[b].pos, Vec2::new(510.0, 0.0));
        assert!((world.racers[b].speed - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_crossing_slows_once_per_cooldown() {
        let mut world = test_world();
        let owner = add(&mut world, RacerKind::Default, Vec2::new(300.0, 0.0));
        give_straight_body(&mut world.racers[owner], Vec2::new(300.0, 0.0), 6);
        let crosser = add(&mut world, RacerKind::Default, Vec2::new(272.0, 5.0));

        apply_body_crossing_rules(&mut world, NOW);
        let slowed = world.racers[crosser].speed;
        assert!((slowed - 100.0 * BODY_CROSS_SLOWDOWN_MUL).abs() < 1e-3);

        apply_body_crossing_rules(&mut world, NOW + 1.0);
        assert!((world.racers[crosser].speed - slowed).abs() < 1e-3);
    }

    #[test]
    fn test_start_grace_suspends_crossing_rules() {
        let mut world = test_world();
        let owner = add(&mut world, RacerKind::Default, Vec2::new(300.0, 0.0));
        give_straight_body(&mut world.racers[owner], Vec2::new(300.0, 0.0), 6);
        let crosser = add(&mut world, RacerKind::Default, Vec2::new(272.0, 5.0));

        // Inside the post-start grace window
        let now_ms = world.body_crossing_grace_until_ms - 1.0;
        apply_body_crossing_rules(&mut world, now_ms);
        assert!((world.racers[crosser].speed - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_cross_accel_boosts_with_cap() {
        let mut world = test_world();
        let owner = add(&mut world, RacerKind::Default, Vec2::new(300.0, 0.0));
        give_straight_body(&mut world.racers[owner], Vec2::new(300.0, 0.0), 6);
        let booster = add(&mut world, RacerKind::CrossAccel, Vec2::new(272.0, 5.0));
        world.racers[booster].speed = world.racers[booster].speed_ceiling() - 1.0;

        apply_body_crossing_rules(&mut world, NOW);

        let racer = &world.racers[booster];
        assert!(racer.speed > racer.profile.max_speed);
        assert!(racer.speed <= racer.speed_ceiling() + 1e-3);
    }

    #[test]
    fn test_speedster_shoulders_around_block() {
        let mut world = test_world();
        let owner = add(&mut world, RacerKind::Default, Vec2::new(300.0, 0.0));
        give_straight_body(&mut world.racers[owner], Vec2::new(300.0, 0.0), 6);
        let speedster = add(&mut world, RacerKind::Speedster, Vec2::new(272.0, 5.0));

        apply_body_crossing_rules(&mut world, NOW);

        let racer = &world.racers[speedster];
        // Pushed away from the blocking segment instead of just slowed, but
        // never teleported beyond the capped shift plus the forward nudge
        let moved = (racer.pos - Vec2::new(272.0, 5.0)).length();
        assert!(moved > 1.0);
        assert!(moved <= SPEEDSTER_BLOCK_MAX_SHIFT + SPEEDSTER_BLOCK_FORWARD_STEP + 1e-3);
        assert!(racer.speed >= 100.0 * 0.96 - 1e-3);
    }

    #[test]
    fn test_never_stop_floor_survives_crossing_effects() {
        let mut world = test_world();
        let owner = add(&mut world, RacerKind::Default, Vec2::new(300.0, 0.0));
        give_straight_body(&mut world.racers[owner], Vec2::new(300.0, 0.0), 6);
        let speedster = add(&mut world, RacerKind::Speedster, Vec2::new(272.0, 5.0));
        world.racers[speedster].profile.never_stop = true;
        world.racers[speedster].speed = 1.0;

        apply_body_crossing_rules(&mut world, NOW);

        assert!(world.racers[speedster].speed >= ALWAYS_MOVE_MIN_SPEED - 1e-3);
    }

    #[test]
    fn test_trickster_tail_bite_shrinks_and_cools_down() {
        let mut world = test_world();
        let victim = add(&mut world, RacerKind::Default, Vec2::new(300.0, 0.0));
        give_straight_body(&mut world.racers[victim], Vec2::new(300.0, 0.0), 6);
        let tail = world.racers[victim].tail_segment().unwrap().pos;
        let biter = add(&mut world, RacerKind::Trickster, tail + Vec2::new(0.0, 6.0));

        apply_body_crossing_rules(&mut world, NOW);

        assert_eq!(world.racers[victim].segment_count, 5);
        assert!(world.racers[biter].tail_bite_until_ms > NOW);

        // Still in bite cooldown, no second bite
        apply_body_crossing_rules(&mut world, NOW + 1.0);
        assert_eq!(world.racers[victim].segment_count, 5);
    }
}
