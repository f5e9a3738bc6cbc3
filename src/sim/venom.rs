//! Venom combat: targeting, projectile motion, hit resolution
//!
//! A shot only exists if a valid target sat in the shooter's forward cone at
//! fire time; after that it flies blind and hits whoever crosses it first.

use super::state::{ControlInput, Racer, RaceWorld, EffectKind, RacePhase, VenomShot};
use crate::consts::*;
use crate::heading_vec;

/// Combat-readiness query the AI folds into its control input
pub fn can_npc_shoot_venom(world: &RaceWorld, racer: &Racer, now_ms: f64) -> bool {
    if racer.finished || world.phase != RacePhase::Running {
        return false;
    }
    if racer.speed < VENOM_MIN_FIRE_SPEED || world.racers.len() < 2 {
        return false;
    }
    if now_ms < racer.next_venom_at_ms {
        return false;
    }
    let venom = racer.profile.venom.clamped();
    find_venom_target(world, racer, venom.range).is_some()
}

/// Best target in range and inside the forward cone: minimize
/// `distance - facing_alignment * bonus` (closer and more directly ahead
/// wins). Returns the target's racer id.
fn find_venom_target(world: &RaceWorld, racer: &Racer, range: f32) -> Option<u32> {
    let heading = heading_vec(racer.heading);
    let mut best: Option<(u32, f32)> = None;

    for target in &world.racers {
        if target.id == racer.id || target.finished {
            continue;
        }
        let delta = target.pos - racer.pos;
        let dist = delta.length();
        if dist > range || dist < 4.0 {
            continue;
        }
        let facing_dot = heading.dot(delta / dist);
        if facing_dot < VENOM_CONE_COS {
            continue;
        }
        let score = dist - facing_dot * VENOM_FACING_BONUS;
        if best.map(|(_, s)| score < s).unwrap_or(true) {
            best = Some((target.id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Fire if the control asks for it and every gate passes. A request with no
/// eligible target in the cone is refused outright - no projectile spawns.
pub fn maybe_shoot_venom(
    world: &mut RaceWorld,
    racer_idx: usize,
    control: &ControlInput,
    now_ms: f64,
) {
    if !control.spit || world.phase != RacePhase::Running {
        return;
    }
    let Some(racer) = world.racers.get(racer_idx) else {
        return;
    };
    if racer.finished || now_ms < racer.next_venom_at_ms {
        return;
    }
    // Same gates as the NPC readiness query; an external spit request gets
    // no special treatment
    if racer.speed < VENOM_MIN_FIRE_SPEED || world.racers.len() < 2 {
        return;
    }
    let venom = racer.profile.venom.clamped();
    if find_venom_target(world, racer, venom.range).is_none() {
        return;
    }

    let racer = &mut world.racers[racer_idx];
    racer.next_venom_at_ms = now_ms + venom.cooldown_ms;
    let dir = heading_vec(racer.heading);
    let shot = VenomShot {
        owner_id: racer.id,
        pos: racer.pos + dir * 13.0,
        dir,
        speed: venom.speed,
        radius: VENOM_PROJECTILE_RADIUS,
        born_at_ms: now_ms,
        max_life_ms: VENOM_PROJECTILE_MAX_LIFE_MS,
        max_travel_dist: venom.range,
        traveled_dist: 0.0,
        duration_ms: venom.duration_ms,
        slow_mul: venom.slow_mul,
        color: racer.color,
    };
    world.venom_shots.push(shot);
}

/// Advance projectiles, cull the dead ones, resolve hits
pub fn update_venom_shots(world: &mut RaceWorld, now_ms: f64, dt: f32) {
    let mut i = 0usize;
    while i < world.venom_shots.len() {
        let shot = &mut world.venom_shots[i];
        if now_ms - shot.born_at_ms > shot.max_life_ms
            || shot.traveled_dist >= shot.max_travel_dist
        {
            world.venom_shots.swap_remove(i);
            continue;
        }

        let step = shot.speed * dt;
        shot.pos += shot.dir * step;
        shot.traveled_dist += step.abs();

        // Dies when it leaves the valid track corridor
        let off_track = match world.track.project_on_track(shot.pos) {
            Some(proj) => proj.distance > world.track.outside_width * VENOM_OFF_TRACK_RATIO,
            None => true,
        };
        if off_track {
            world.venom_shots.swap_remove(i);
            continue;
        }

        let shot_pos = shot.pos;
        let shot_radius = shot.radius;
        let owner_id = shot.owner_id;
        let hit_limit = shot_radius + VENOM_PROJECTILE_HIT_RADIUS;
        // First non-owner, unfinished racer within hit radius by iteration
        // order
        let hit = world.racers.iter().position(|target| {
            target.id != owner_id
                && !target.finished
                && (target.pos - shot_pos).length_squared() <= hit_limit * hit_limit
        });

        match hit {
            Some(target_idx) => {
                let (duration_ms, slow_mul) = {
                    let shot = &world.venom_shots[i];
                    (shot.duration_ms, shot.slow_mul)
                };
                apply_venom_hit(&mut world.racers[target_idx], duration_ms, slow_mul, now_ms);
                world.venom_shots.swap_remove(i);
            }
            None => i += 1,
        }
    }
}

fn apply_venom_hit(target: &mut Racer, duration_ms: f64, slow_mul: f32, now_ms: f64) {
    if target.shield_charges > 0 {
        target.shield_charges -= 1;
        target.remove_effect(EffectKind::Shield);
        log::debug!("racer {} shield absorbed venom", target.id);
        return;
    }
    log::debug!("racer {} venom-slowed x{:.2}", target.id, slow_mul);
    target.add_effect(EffectKind::VenomSlow, duration_ms, now_ms, slow_mul);
}
