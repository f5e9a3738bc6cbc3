//! Top-level simulation step
//!
//! `tick` is the only mutation entry point: feed it the world, the player's
//! control input and a wall-clock timestamp, and every sub-system runs in a
//! fixed order. Keeping the order fixed is what makes replays and lockstep
//! networking possible.

use super::state::{ControlInput, RacePhase, RaceWorld};
use super::{ai, body, collision, items, kinematics, progress, venom};
use crate::consts::*;

/// Per-tick external input
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Control for the player racer, if one is present and being driven
    pub player_control: Option<ControlInput>,
}

/// Advance the whole race by one step of (clamped) `dt` seconds
pub fn tick(world: &mut RaceWorld, input: &TickInput, now_ms: f64, dt: f32) {
    let dt = dt.clamp(DT_MIN, DT_MAX);

    match world.phase {
        RacePhase::Countdown => {
            if now_ms >= world.countdown_until_ms {
                log::info!("race started ({} racers)", world.racers.len());
                world.phase = RacePhase::Running;
            } else {
                // Bodies form on the grid but nobody moves yet
                body::update_body_segments_for_race(world);
                progress::compute_standings(world);
                return;
            }
        }
        RacePhase::Finished => {
            // Keep the field coasting for the podium screen
            for racer in &mut world.racers {
                kinematics::step_finished_racer(&world.track, racer, dt);
            }
            body::update_body_segments_for_race(world);
            return;
        }
        RacePhase::Running => {}
    }

    body::update_body_segments_for_race(world);
    items::update_body_items(world, now_ms);
    items::update_pickups(world, now_ms);
    items::update_racer_hunger(world, now_ms);

    // Controls are decided against the pre-step world so racer order can't
    // leak into steering decisions
    let controls: Vec<ControlInput> = (0..world.racers.len())
        .map(|i| {
            let racer = &world.racers[i];
            if racer.finished {
                ControlInput::default()
            } else if racer.is_player {
                input.player_control.unwrap_or_default()
            } else {
                ai::build_npc_control(world, racer, now_ms)
            }
        })
        .collect();

    for (i, control) in controls.iter().enumerate() {
        if world.racers[i].finished {
            kinematics::step_finished_racer(&world.track, &mut world.racers[i], dt);
        } else {
            kinematics::step_racer(&world.track, &mut world.racers[i], control, now_ms, dt);
        }
    }

    collision::apply_body_crossing_rules(world, now_ms);
    kinematics::prevent_racer_stall(world, now_ms);

    for (i, control) in controls.iter().enumerate() {
        venom::maybe_shoot_venom(world, i, control, now_ms);
    }

    progress::update_checkpoint_progress(world, now_ms);
    items::check_body_item_collection(world, now_ms);
    items::check_pickup_collection(world, now_ms);
    venom::update_venom_shots(world, now_ms, dt);
    collision::resolve_racer_collisions(world, now_ms);
    progress::compute_standings(world);

    if !world.racers.is_empty() && world.racers.iter().all(|r| r.finished) {
        log::info!("race finished");
        world.phase = RacePhase::Finished;
    }
}
