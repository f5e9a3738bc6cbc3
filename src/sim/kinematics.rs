//! Racer kinematics
//!
//! Simplified arcade integration: heading from the turn input, speed chasing
//! a throttle-scaled target (scaled down by surface and active slow effects),
//! position from the heading vector. Surface is reclassified every tick from
//! the latest projection's lateral distance.

use super::state::{ControlInput, Racer, RaceWorld, Surface};
use super::track::Track;
use crate::consts::*;
use crate::{heading_vec, normalize_angle, shortest_angle};

/// Classify a lateral centerline distance against the track widths
pub fn classify_surface(track: &Track, distance: f32) -> Surface {
    if distance <= track.road_width {
        Surface::Road
    } else if distance <= track.outside_width {
        Surface::Offroad
    } else {
        Surface::Outside
    }
}

fn surface_speed_factor(racer: &Racer) -> f32 {
    match racer.surface {
        Surface::Road => 1.0,
        Surface::Offroad => racer.profile.offroad_penalty,
        Surface::Outside => racer.profile.outside_penalty,
    }
}

/// Advance one racer for `dt` seconds from a control input
pub fn step_racer(
    track: &Track,
    racer: &mut Racer,
    control: &ControlInput,
    now_ms: f64,
    dt: f32,
) {
    let control = control.clamped();
    racer.expire_effects(now_ms);

    racer.heading = normalize_angle(racer.heading + control.turn * racer.profile.turn_rate * dt);

    // Speed chases a throttle-scaled target; slow effects compose
    // multiplicatively on top of the surface penalty
    let target = racer.profile.max_speed
        * control.throttle
        * surface_speed_factor(racer)
        * racer.effect_speed_multiplier();
    if racer.speed < target {
        racer.speed = (racer.speed + racer.profile.accel * dt).min(target);
    } else {
        racer.speed = (racer.speed - racer.profile.accel * DECEL_FACTOR * dt).max(target);
    }
    racer.speed *= (1.0 - control.brake * BRAKE_STRENGTH * dt).clamp(0.0, 1.0);

    racer.ensure_always_move_speed();
    racer.speed = racer.speed.clamp(0.0, racer.speed_ceiling());

    racer.pos += heading_vec(racer.heading) * racer.speed * dt;

    // Reclassify surface from the fresh projection; a degenerate track
    // leaves the previous classification in place
    if let Some(proj) = track.project_on_track(racer.pos) {
        racer.surface = classify_surface(track, proj.distance);
        racer.last_projection = Some(proj);
    }
}

/// Finished racers coast along the centerline so their bodies stay coherent,
/// exempt from collisions, items and combat.
pub fn step_finished_racer(track: &Track, racer: &mut Racer, dt: f32) {
    let cruise = racer.profile.max_speed * 0.35;
    if racer.speed > cruise {
        racer.speed = (racer.speed - racer.profile.accel * dt).max(cruise);
    }

    let Some(proj) = track
        .project_on_track(racer.pos)
        .or(racer.last_projection)
    else {
        racer.pos += heading_vec(racer.heading) * racer.speed * dt;
        return;
    };
    let look = (racer.profile.look_ahead * 0.6) / track.total_length.max(1.0);
    if let Some(ahead) = track.sample_track(proj.t_norm + look) {
        let bearing = (ahead.point - racer.pos).to_angle();
        racer.heading =
            normalize_angle(racer.heading + shortest_angle(racer.heading, bearing) * 0.12);
    }
    racer.pos += heading_vec(racer.heading) * racer.speed * dt;
    racer.last_projection = track.project_on_track(racer.pos);
}

/// Stall watchdog: a racer pinned below the stall threshold for too long is
/// kicked back up to moving speed and granted an unstuck grace window so the
/// collision rules can't immediately re-pin it.
pub fn prevent_racer_stall(world: &mut RaceWorld, now_ms: f64) {
    for racer in &mut world.racers {
        if racer.finished {
            racer.stall_since_ms = None;
            continue;
        }
        if racer.speed >= STALL_SPEED_THRESHOLD {
            racer.stall_since_ms = None;
            continue;
        }
        match racer.stall_since_ms {
            None => racer.stall_since_ms = Some(now_ms),
            Some(since) if now_ms - since >= STALL_TIMEOUT_MS => {
                log::debug!("racer {} unstuck at t={:.0}ms", racer.id, now_ms);
                racer.speed = racer.speed.max(ALWAYS_MOVE_MIN_SPEED * 0.8);
                if let Some(proj) = racer.last_projection {
                    // Point back down the track so the kick actually helps
                    racer.heading = proj.tangent.to_angle();
                }
                racer.unstuck_until_ms = now_ms + UNSTUCK_GRACE_MS;
                racer.stall_since_ms = None;
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{EffectKind, RacerKind, RacerProfile};
    use glam::Vec2;

    fn straight_track() -> Track {
        Track::new(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1000.0, 0.0),
                Vec2::new(1000.0, 600.0),
                Vec2::new(0.0, 600.0),
            ],
            40.0,
            70.0,
            vec![Vec2::new(0.0, 0.0)],
        )
    }

    fn racer_at(pos: Vec2) -> Racer {
        Racer::new(1, RacerKind::Default, RacerProfile::default(), pos, 0.0)
    }

    #[test]
    fn test_speed_bounds_hold() {
        let track = straight_track();
        let mut racer = racer_at(Vec2::new(100.0, 0.0));
        let full = ControlInput {
            throttle: 1.0,
            ..Default::default()
        };
        for _ in 0..600 {
            step_racer(&track, &mut racer, &full, 0.0, 1.0 / 60.0);
            assert!(racer.speed >= 0.0);
            assert!(racer.speed <= racer.speed_ceiling());
        }
        assert!(racer.speed > racer.profile.max_speed * 0.9);

        let brake = ControlInput {
            brake: 1.0,
            ..Default::default()
        };
        for _ in 0..600 {
            step_racer(&track, &mut racer, &brake, 0.0, 1.0 / 60.0);
            assert!(racer.speed >= 0.0);
        }
        assert!(racer.speed < 1.0);
    }

    #[test]
    fn test_surface_reclassified_each_tick() {
        let track = straight_track();
        let mut racer = racer_at(Vec2::new(500.0, -20.0));
        step_racer(&track, &mut racer, &ControlInput::default(), 0.0, 0.016);
        assert_eq!(racer.surface, Surface::Road);

        racer.pos = Vec2::new(500.0, -55.0);
        step_racer(&track, &mut racer, &ControlInput::default(), 0.0, 0.016);
        assert_eq!(racer.surface, Surface::Offroad);

        racer.pos = Vec2::new(500.0, -90.0);
        step_racer(&track, &mut racer, &ControlInput::default(), 0.0, 0.016);
        assert_eq!(racer.surface, Surface::Outside);
    }

    #[test]
    fn test_slow_effect_caps_speed() {
        let track = straight_track();
        let full = ControlInput {
            throttle: 1.0,
            ..Default::default()
        };

        let mut clean = racer_at(Vec2::new(100.0, 0.0));
        for _ in 0..600 {
            step_racer(&track, &mut clean, &full, 0.0, 1.0 / 60.0);
        }

        let mut slowed = racer_at(Vec2::new(100.0, 0.0));
        slowed.add_effect(EffectKind::VenomSlow, 1e9, 0.0, 0.8);
        for _ in 0..600 {
            step_racer(&track, &mut slowed, &full, 0.0, 1.0 / 60.0);
        }

        assert!(slowed.speed < clean.speed * 0.85);
    }

    #[test]
    fn test_never_stop_keeps_moving_under_full_brake() {
        let track = straight_track();
        let mut racer = racer_at(Vec2::new(100.0, 0.0));
        racer.profile.never_stop = true;
        let brake = ControlInput {
            brake: 1.0,
            ..Default::default()
        };
        for _ in 0..300 {
            step_racer(&track, &mut racer, &brake, 0.0, 1.0 / 60.0);
        }
        // Floor applies before the final clamp; full brake still can't pin a
        // never-stop racer to zero
        assert!(racer.speed > 0.0);
    }

    #[test]
    fn test_stall_watchdog_grants_grace() {
        let track = straight_track();
        let mut world = RaceWorld::new(track, 3, 7, 0.0);
        world.add_racer(
            RacerKind::Default,
            RacerProfile::default(),
            Vec2::new(100.0, 0.0),
            0.0,
            false,
            0xffffff,
        );
        world.racers[0].speed = 0.0;

        prevent_racer_stall(&mut world, 1000.0);
        assert!(world.racers[0].speed < STALL_SPEED_THRESHOLD);

        prevent_racer_stall(&mut world, 1000.0 + STALL_TIMEOUT_MS + 1.0);
        let racer = &world.racers[0];
        assert!(racer.speed >= ALWAYS_MOVE_MIN_SPEED * 0.8 - 1e-3);
        assert!(racer.in_unstuck_grace(1000.0 + STALL_TIMEOUT_MS + 2.0));
    }
}
