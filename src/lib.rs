//! Serpent Circuit - deterministic racing simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track geometry, kinematics, AI, combat)
//! - `catalog`: Built-in track definitions and racer profiles
//!
//! Rendering, menu flow, persistence and networking are collaborators that
//! consume read-only world snapshots and inject control inputs; none of them
//! live in this crate.

pub mod catalog;
pub mod sim;

pub use catalog::{racer_profile, track_def, TrackDef};
pub use sim::state::{ControlInput, RacePhase, RaceWorld, RacerKind};
pub use sim::tick::{tick, TickInput};

use glam::Vec2;

/// Game tuning constants
pub mod consts {
    /// Fixed simulation timestep the headless runner uses (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Safe band for a single tick's dt (seconds); frame hitches get clamped
    pub const DT_MIN: f32 = 0.001;
    pub const DT_MAX: f32 = 0.033;

    /// Countdown duration before the race phase flips to running
    pub const COUNTDOWN_MS: f64 = 3000.0;

    /// Head circle used for racer-vs-racer separation
    pub const RACER_COLLISION_RADIUS: f32 = 13.0;
    /// Head circle used for body-crossing and item collection checks
    pub const HEAD_RADIUS: f32 = 10.0;
    /// Minimum interval between repeated collision penalties for a racer
    pub const IMPACT_COOLDOWN_MS: f64 = 220.0;
    /// Extra shove a bully gives a non-bully opponent along the contact normal
    pub const BULLY_PUSH_DISTANCE: f32 = 6.0;

    /// Body segments can never drop below this floor
    pub const MIN_BODY_SEGMENTS: u32 = 3;
    pub const MAX_BODY_SEGMENTS: u32 = 24;
    /// Arc spacing between derived trailing segments
    pub const SEGMENT_SPACING: f32 = 14.0;
    pub const SEGMENT_RADIUS: f32 = 9.0;
    /// Minimum head movement before a new history sample is recorded
    pub const HISTORY_SAMPLE_DIST: f32 = 3.0;

    /// Full brake sheds this fraction of speed per second
    pub const BRAKE_STRENGTH: f32 = 3.2;
    /// Deceleration toward a lower target speed is this much faster than
    /// acceleration toward a higher one
    pub const DECEL_FACTOR: f32 = 1.4;

    /// Speed floor for racer types that must never come to rest
    pub const ALWAYS_MOVE_MIN_SPEED: f32 = 26.0;
    /// Below this speed the stall watchdog starts counting
    pub const STALL_SPEED_THRESHOLD: f32 = 6.0;
    pub const STALL_TIMEOUT_MS: f64 = 1200.0;
    /// Grace window granted after an unstuck correction
    pub const UNSTUCK_GRACE_MS: f64 = 600.0;

    /// Body-crossing rules
    pub const BODY_CROSS_SLOWDOWN_MUL: f32 = 0.9;
    pub const BODY_CROSSING_EFFECT_COOLDOWN_MS: f64 = 420.0;
    pub const CROSS_ACCEL_BOOST_MUL: f32 = 1.08;
    pub const CROSS_ACCEL_SPEED_CAP: f32 = 1.18;
    pub const SPEEDSTER_BODY_BLOCK_PUSH: f32 = 10.0;
    pub const SPEEDSTER_BLOCK_EXTRA_TURN: f32 = 0.42;
    pub const SPEEDSTER_BLOCK_NUDGE: f32 = 2.4;
    pub const SPEEDSTER_BLOCK_MAX_SHIFT: f32 = 7.0;
    pub const SPEEDSTER_BLOCK_FORWARD_STEP: f32 = 3.2;
    pub const TAIL_BITE_COOLDOWN_MS: f64 = 900.0;
    pub const TAIL_BITE_RANGE_PAD: f32 = 2.0;

    /// Items and hunger
    pub const APPLE_RADIUS: f32 = 8.0;
    pub const CACTUS_RADIUS: f32 = 10.0;
    pub const PICKUP_RADIUS: f32 = 12.0;
    pub const APPLE_STARTLINE_AVOID_RADIUS: f32 = 140.0;
    pub const ITEM_RESPAWN_MS: f64 = 5500.0;
    pub const HUNGER_STEP_INTERVAL_MS: f64 = 4000.0;
    /// After this many hunger steps a racer starts shedding segments
    pub const HUNGER_SHED_STEPS: u32 = 8;
    pub const BOMB_SLOW_DURATION_MS: f64 = 2600.0;
    pub const BOMB_SLOW_MUL: f32 = 0.72;
    pub const SHIELD_EFFECT_MS: f64 = 60_000.0;

    /// NPC steering
    pub const NPC_HAZARD_LOOKAHEAD_DELTA: f32 = 0.07;
    pub const NPC_BOMB_AVOID_RADIUS: f32 = 150.0;
    pub const NPC_CACTUS_AVOID_RADIUS: f32 = 110.0;
    pub const NPC_BOMB_AVOID_WEIGHT: f32 = 1.0;
    pub const NPC_CACTUS_AVOID_WEIGHT: f32 = 0.8;
    pub const NPC_HAZARD_AVOID_MAX_SHIFT: f32 = 64.0;
    pub const NPC_EDGE_CAUTION_START_RATIO: f32 = 0.62;
    pub const NPC_EDGE_AVOID_LOOKAHEAD: f32 = 0.012;

    /// Venom projectiles
    pub const VENOM_PROJECTILE_RADIUS: f32 = 5.0;
    pub const VENOM_PROJECTILE_SPEED: f32 = 340.0;
    pub const VENOM_PROJECTILE_HIT_RADIUS: f32 = 11.0;
    pub const VENOM_PROJECTILE_MAX_LIFE_MS: f64 = 1500.0;
    pub const VENOM_SLOW_BASE_DURATION_MS: f64 = 2000.0;
    pub const VENOM_MIN_FIRE_SPEED: f32 = 18.0;
    /// cos(0.56 rad) - forward cone half-angle for target eligibility
    pub const VENOM_CONE_COS: f32 = 0.847_255;
    /// How strongly facing alignment discounts distance in target scoring
    pub const VENOM_FACING_BONUS: f32 = 16.0;
    /// Projectiles die once their projection drifts this far past the verge
    pub const VENOM_OFF_TRACK_RATIO: f32 = 1.15;

    /// Checkpoint pass detection radius
    pub const CHECKPOINT_PASS_RADIUS: f32 = 95.0;
}

/// Normalize angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Shortest signed angle from `from` to `to`
#[inline]
pub fn shortest_angle(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Wrap a track fraction into [0, 1)
#[inline]
pub fn mod1(t: f32) -> f32 {
    let r = t.rem_euclid(1.0);
    if r >= 1.0 { 0.0 } else { r }
}

/// Unit heading vector for an angle
#[inline]
pub fn heading_vec(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_shortest_angle_wraps() {
        let a = shortest_angle(PI - 0.1, -PI + 0.1);
        assert!((a - 0.2).abs() < 1e-5);
        let b = shortest_angle(-PI + 0.1, PI - 0.1);
        assert!((b + 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_mod1_range() {
        assert!((mod1(1.25) - 0.25).abs() < 1e-6);
        assert!((mod1(-0.25) - 0.75).abs() < 1e-6);
        assert_eq!(mod1(1.0), 0.0);
    }

    #[test]
    fn test_heading_vec_unit_length() {
        for h in [-3.0_f32, -0.5, 0.0, 1.2, 3.1] {
            assert!((heading_vec(h).length() - 1.0).abs() < 1e-5);
        }
    }
}
