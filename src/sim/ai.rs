//! NPC steering
//!
//! Layered heuristic: follow a look-ahead point on the centerline, blend it
//! toward food when hungry, shift it away from hazards, pull it back toward a
//! safe lane near the edge, then derive throttle/brake/turn from the heading
//! error and the accumulated caution.

use glam::Vec2;

use super::state::{BodyItemKind, ControlInput, EffectKind, PickupKind, Racer, RaceWorld, Surface};
use super::track::{Track, TrackProjection};
use super::venom;
use crate::consts::*;
use crate::{heading_vec, lerp, mod1, shortest_angle};

/// Build the control input for one NPC racer this tick
pub fn build_npc_control(world: &RaceWorld, racer: &Racer, now_ms: f64) -> ControlInput {
    let Some(projection) = racer
        .last_projection
        .or_else(|| world.track.project_on_track(racer.pos))
    else {
        // Degenerate track: coast straight
        return ControlInput {
            throttle: 0.5,
            ..Default::default()
        };
    };

    let look_ahead = racer.profile.look_ahead + racer.speed * 0.32;
    let target_fraction = mod1(projection.t_norm + look_ahead / world.track.total_length.max(1.0));
    let Some(track_sample) = world.track.sample_track(target_fraction) else {
        return ControlInput::default();
    };

    let apple_target = find_apple_target(world, racer, &projection);
    let blended = blend_apple_target(track_sample.point, apple_target, racer);
    let (hazard_dir, hazard_intensity) = hazard_avoidance(world, racer, &projection);
    let (edge_target, edge_intensity) = edge_avoidance(world, racer, &projection);

    let mut target = shift_target_from_hazards(world, blended, hazard_dir, hazard_intensity);
    if let Some(edge_target) = edge_target {
        let edge_blend = lerp(0.62, 0.99, edge_intensity);
        target = target.lerp(edge_target, edge_blend);
    }

    let apple_attraction = apple_attraction(racer);
    let caution = (hazard_intensity * 0.7 + edge_intensity * 1.4).clamp(0.0, 1.0);
    let desired_heading = (target - racer.pos).to_angle();
    let angle = shortest_angle(racer.heading, desired_heading);

    let mut throttle = 1.0_f32;
    let mut brake = 0.0_f32;
    if angle.abs() > racer.profile.brake_angle {
        throttle = 0.42;
        brake = 0.26;
    }
    if racer.surface != Surface::Road {
        let outside = racer.surface == Surface::Outside;
        throttle = throttle.min(if outside { 0.46 } else { 0.66 });
        brake = brake.max(if outside { 0.32 } else { 0.16 });
    }
    if racer.has_effect(EffectKind::BombSlow) {
        // Already slowed; coasting harder just loses more ground
        throttle = throttle.max(0.82);
        brake = brake.max(0.06);
    }
    if apple_attraction > 0.0 && caution < 0.34 && edge_intensity < 0.22 {
        throttle = throttle.max(lerp(0.9, 1.0, apple_attraction));
        brake = brake.min(lerp(0.14, 0.0, apple_attraction));
    }
    if caution > 0.0 {
        throttle = throttle.min(lerp(0.84, 0.34, caution));
        brake = brake.max(lerp(0.08, 0.42, caution));
    }
    if edge_intensity > 0.35 {
        throttle = throttle.min(0.62);
        brake = brake.max(0.14);
    }
    if edge_intensity > 0.58 {
        throttle = throttle.min(0.44);
        brake = brake.max(0.26);
    }
    if edge_intensity > 0.78 {
        throttle = throttle.min(0.28);
        brake = brake.max(0.42);
    }
    if racer.speed < 12.0 {
        if caution < 0.55 {
            throttle = throttle.max(0.92);
            brake = 0.0;
        } else {
            throttle = throttle.max(0.7);
            brake = brake.max(0.12);
        }
    }
    if racer.profile.never_stop {
        let cautious_mode = caution >= 0.2 || racer.surface != Surface::Road;
        if !cautious_mode {
            throttle = throttle.max(0.96);
            brake = 0.0;
            if racer.speed < ALWAYS_MOVE_MIN_SPEED * 0.7 {
                throttle = 1.0;
            }
        } else {
            throttle = throttle.max(if edge_intensity > 0.62 { 0.34 } else { 0.5 });
            brake = brake.max(lerp(
                0.1,
                0.34,
                (caution + edge_intensity * 0.32).clamp(0.0, 1.0),
            ));
        }
    }

    let steer_gain = racer.profile.steer_gain * (1.0 + caution * 0.65 + edge_intensity * 0.9);

    ControlInput {
        throttle: throttle.clamp(0.0, 1.0),
        brake: brake.clamp(0.0, 1.0),
        turn: (angle * steer_gain).clamp(-1.0, 1.0),
        spit: venom::can_npc_shoot_venom(world, racer, now_ms),
    }
}

/// Hunger-driven apple attraction in [0, 1]; a near-minimum body adds an
/// emergency bonus
fn apple_attraction(racer: &Racer) -> f32 {
    let hunger = (racer.exhaustion_steps as f32 / 5.0).clamp(0.0, 1.0);
    let emergency = if racer.segment_count <= MIN_BODY_SEGMENTS + 1 {
        0.18
    } else {
        0.0
    };
    (hunger + emergency).clamp(0.0, 1.0)
}

/// Best eligible apple ahead of the racer, if any
fn find_apple_target(
    world: &RaceWorld,
    racer: &Racer,
    projection: &TrackProjection,
) -> Option<Vec2> {
    let attraction = apple_attraction(racer);
    if attraction <= 0.02 && racer.segment_count >= racer.profile.base_segments + 2 {
        return None;
    }

    let start = world.track.checkpoints.first().copied();
    let max_forward_delta = lerp(0.18, 0.42, attraction);
    let max_distance = lerp(235.0, 520.0, attraction);
    let forward_weight = lerp(0.75, 0.34, attraction);
    let distance_norm = lerp(850.0, 1300.0, attraction);

    let mut best: Option<(Vec2, f32)> = None;
    for item in &world.body_items {
        if !item.active || item.kind != BodyItemKind::Apple {
            continue;
        }
        if let Some(start) = start {
            if (item.pos - start).length_squared()
                < APPLE_STARTLINE_AVOID_RADIUS * APPLE_STARTLINE_AVOID_RADIUS
            {
                continue;
            }
        }
        let Some(item_proj) = world.track.project_on_track(item.pos) else {
            continue;
        };
        let forward_delta = Track::forward_track_delta(projection.t_norm, item_proj.t_norm);
        if forward_delta <= 1e-4 || forward_delta > max_forward_delta {
            continue;
        }
        let dist = (item.pos - racer.pos).length();
        if dist > max_distance {
            continue;
        }
        let score = forward_delta * forward_weight + dist / distance_norm;
        if best.map(|(_, s)| score < s).unwrap_or(true) {
            best = Some((item.pos, score));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Blend the track-follow target toward a chosen apple, weighted by hunger
/// and closeness
fn blend_apple_target(track_target: Vec2, apple_target: Option<Vec2>, racer: &Racer) -> Vec2 {
    let Some(apple) = apple_target else {
        return track_target;
    };
    let attraction = apple_attraction(racer);
    let apple_dist = (apple - racer.pos).length();
    let max_distance = lerp(300.0, 700.0, attraction);
    let min_weight = lerp(0.1, 0.72, attraction);
    let max_weight = lerp(0.44, 0.95, attraction);
    let weight = (1.0 - apple_dist / max_distance).clamp(min_weight, max_weight);
    track_target.lerp(apple, weight)
}

/// Repulsion vector from bombs and cacti ahead within lookahead range.
/// Returns a unit direction and an intensity in [0, 1]; zero when nothing
/// threatens (including the near-zero-vector edge case).
fn hazard_avoidance(
    world: &RaceWorld,
    racer: &Racer,
    projection: &TrackProjection,
) -> (Vec2, f32) {
    struct Hazard {
        pos: Vec2,
        radius: f32,
        weight: f32,
    }

    let mut hazards = Vec::new();
    for pickup in &world.pickups {
        if pickup.active && pickup.kind == PickupKind::Bomb {
            hazards.push(Hazard {
                pos: pickup.pos,
                radius: NPC_BOMB_AVOID_RADIUS,
                weight: NPC_BOMB_AVOID_WEIGHT,
            });
        }
    }
    for item in &world.body_items {
        if item.active && item.kind == BodyItemKind::Cactus {
            hazards.push(Hazard {
                pos: item.pos,
                radius: NPC_CACTUS_AVOID_RADIUS,
                weight: NPC_CACTUS_AVOID_WEIGHT,
            });
        }
    }

    let mut avoid = Vec2::ZERO;
    let mut total_influence = 0.0_f32;
    for hazard in &hazards {
        let Some(hazard_proj) = world.track.project_on_track(hazard.pos) else {
            continue;
        };
        let forward_delta = Track::forward_track_delta(projection.t_norm, hazard_proj.t_norm);
        if forward_delta <= 1e-4 || forward_delta > NPC_HAZARD_LOOKAHEAD_DELTA {
            continue;
        }
        let dist = (racer.pos - hazard.pos).length();
        if dist >= hazard.radius {
            continue;
        }
        let distance_factor = 1.0 - dist / hazard.radius;
        let forward_factor = 1.0 - forward_delta / NPC_HAZARD_LOOKAHEAD_DELTA;
        let influence = hazard.weight * distance_factor * forward_factor;
        if influence <= 0.0 {
            continue;
        }
        avoid += (racer.pos - hazard.pos).normalize_or_zero() * influence;
        total_influence += influence;
    }

    if total_influence <= 1e-4 {
        return (Vec2::ZERO, 0.0);
    }
    let intensity =
        (total_influence / (NPC_BOMB_AVOID_WEIGHT + NPC_CACTUS_AVOID_WEIGHT)).clamp(0.0, 1.0);
    (avoid.normalize_or_zero(), intensity)
}

/// Shift the steering target laterally away from hazards, clamped to stay
/// within the road
fn shift_target_from_hazards(
    world: &RaceWorld,
    target: Vec2,
    avoid_dir: Vec2,
    intensity: f32,
) -> Vec2 {
    if intensity <= 0.0 {
        return target;
    }
    let shifted = target + avoid_dir * (NPC_HAZARD_AVOID_MAX_SHIFT * intensity);
    let Some(proj) = world.track.project_on_track(shifted) else {
        return shifted;
    };
    let limit = world.track.road_width * 0.74;
    let lateral = (shifted - proj.point).dot(proj.normal).clamp(-limit, limit);
    proj.point + proj.normal * lateral
}

/// Pull toward a safer lane when sitting past the caution threshold, harder
/// when already offroad/outside or still heading outward
fn edge_avoidance(
    world: &RaceWorld,
    racer: &Racer,
    projection: &TrackProjection,
) -> (Option<Vec2>, f32) {
    let caution_start = world.track.road_width * NPC_EDGE_CAUTION_START_RATIO;
    let range = (world.track.outside_width - caution_start).max(1.0);
    let raw = ((projection.distance - caution_start) / range).clamp(0.0, 1.0);
    let mut intensity = (raw.powf(0.62) * 1.08).clamp(0.0, 1.0);
    match racer.surface {
        Surface::Outside => intensity = 1.0,
        Surface::Offroad => intensity = intensity.max(0.68),
        Surface::Road => {}
    }
    if intensity <= 0.001 {
        return (None, 0.0);
    }

    let Some(ahead) = world.track.sample_track(mod1(
        projection.t_norm + NPC_EDGE_AVOID_LOOKAHEAD + intensity * 0.018,
    )) else {
        return (None, 0.0);
    };
    let normal = Vec2::new(-ahead.tangent.y, ahead.tangent.x);
    let lateral = (racer.pos - ahead.point).dot(normal);
    let lateral_sign = if lateral < 0.0 { -1.0 } else { 1.0 };
    let outward_dot = heading_vec(racer.heading).dot(normal * lateral_sign);
    if outward_dot > 0.0 {
        intensity = (intensity + outward_dot * 0.26).clamp(0.0, 1.0);
    }

    let safe_limit = lerp(
        world.track.road_width * 0.52,
        world.track.road_width * 0.16,
        intensity,
    );
    let safe_lateral = lateral.clamp(-safe_limit, safe_limit);
    let lane_target = ahead.point + normal * safe_lateral;
    let center_blend = lerp(0.54, 0.96, intensity);
    (Some(lane_target.lerp(ahead.point, center_blend)), intensity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{BodyItem, RacerKind, RacerProfile};

    fn test_world() -> RaceWorld {
        let track = Track::new(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(2000.0, 0.0),
                Vec2::new(2000.0, 800.0),
                Vec2::new(0.0, 800.0),
            ],
            40.0,
            70.0,
            vec![Vec2::new(0.0, 0.0), Vec2::new(2000.0, 800.0)],
        );
        RaceWorld::new(track, 3, 11, 0.0)
    }

    fn npc_at(world: &mut RaceWorld, pos: Vec2, heading: f32) -> Racer {
        let id = world.add_racer(
            RacerKind::Default,
            RacerProfile::default(),
            pos,
            heading,
            false,
            0xffffff,
        );
        let mut racer = world.racer_by_id(id).unwrap().clone();
        racer.last_projection = world.track.project_on_track(pos);
        racer
    }

    #[test]
    fn test_hungry_racer_pulls_toward_apple_and_floors_throttle() {
        let mut world = test_world();
        let mut racer = npc_at(&mut world, Vec2::new(600.0, 0.0), 0.0);
        racer.exhaustion_steps = 5; // full hunger
        racer.speed = 100.0;
        let apple_pos = Vec2::new(700.0, 0.0);
        world.body_items.push(BodyItem {
            pos: apple_pos,
            kind: BodyItemKind::Apple,
            radius: APPLE_RADIUS,
            active: true,
            respawn_at_ms: 0.0,
        });

        let projection = racer.last_projection.unwrap();
        let look_ahead = racer.profile.look_ahead + racer.speed * 0.32;
        let pure_fraction = mod1(projection.t_norm + look_ahead / world.track.total_length);
        let pure_target = world.track.sample_track(pure_fraction).unwrap().point;

        let apple_target = find_apple_target(&world, &racer, &projection);
        assert_eq!(apple_target, Some(apple_pos));
        let blended = blend_apple_target(pure_target, apple_target, &racer);
        assert!((blended - apple_pos).length() < (pure_target - apple_pos).length());

        let control = build_npc_control(&world, &racer, 0.0);
        assert!(control.throttle >= 0.9);
    }

    #[test]
    fn test_sated_long_racer_ignores_apples() {
        let mut world = test_world();
        let mut racer = npc_at(&mut world, Vec2::new(600.0, 0.0), 0.0);
        racer.exhaustion_steps = 0;
        racer.segment_count = racer.profile.base_segments + 3;
        world.body_items.push(BodyItem {
            pos: Vec2::new(700.0, 0.0),
            kind: BodyItemKind::Apple,
            radius: APPLE_RADIUS,
            active: true,
            respawn_at_ms: 0.0,
        });
        let projection = racer.last_projection.unwrap();
        assert!(find_apple_target(&world, &racer, &projection).is_none());
    }

    #[test]
    fn test_no_hazards_means_zero_avoidance() {
        let mut world = test_world();
        let racer = npc_at(&mut world, Vec2::new(600.0, 0.0), 0.0);
        let projection = racer.last_projection.unwrap();
        let (dir, intensity) = hazard_avoidance(&world, &racer, &projection);
        assert_eq!(dir, Vec2::ZERO);
        assert_eq!(intensity, 0.0);
    }

    #[test]
    fn test_bomb_ahead_repels_and_raises_caution() {
        let mut world = test_world();
        let racer = npc_at(&mut world, Vec2::new(600.0, 0.0), 0.0);
        world.pickups.push(crate::sim::state::Pickup {
            pos: Vec2::new(680.0, 0.0),
            kind: PickupKind::Bomb,
            active: true,
            respawn_at_ms: 0.0,
        });
        let projection = racer.last_projection.unwrap();
        let (dir, intensity) = hazard_avoidance(&world, &racer, &projection);
        assert!(intensity > 0.0);
        // Repelled away from the bomb, i.e. roughly -X
        assert!(dir.x < 0.0);
    }

    #[test]
    fn test_edge_caution_caps_throttle() {
        let mut world = test_world();
        // Offroad, heading further outward
        let mut racer = npc_at(
            &mut world,
            Vec2::new(600.0, -55.0),
            -std::f32::consts::FRAC_PI_2,
        );
        racer.surface = Surface::Offroad;
        racer.speed = 120.0;

        let control = build_npc_control(&world, &racer, 0.0);
        assert!(control.throttle <= 0.66);
        assert!(control.brake >= 0.14);
    }

    #[test]
    fn test_turn_sign_tracks_heading_error() {
        let mut world = test_world();
        // On the bottom straight heading -Y (off the road axis); the
        // look-ahead target is toward +X, so the correction is a left turn
        // (positive angle from -π/2 toward 0)
        let mut racer = npc_at(
            &mut world,
            Vec2::new(600.0, 10.0),
            -std::f32::consts::FRAC_PI_2,
        );
        racer.speed = 80.0;
        let control = build_npc_control(&world, &racer, 0.0);
        assert!(control.turn > 0.0);
    }
}
