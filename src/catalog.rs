//! Built-in track definitions and racer profiles
//!
//! Tracks are closed centerline polylines with ordered checkpoints sitting
//! on them; profiles are the per-kind tuning records the simulation consumes.

use glam::Vec2;
use serde::Serialize;

use crate::consts::COUNTDOWN_MS;
use crate::sim::items::spawn_items;
use crate::sim::state::{RaceWorld, RacerKind, RacerProfile, VenomConfig};
use crate::sim::track::Track;

/// A track as authored: geometry plus race parameters
#[derive(Debug, Clone, Serialize)]
pub struct TrackDef {
    pub name: &'static str,
    pub points: Vec<Vec2>,
    pub road_width: f32,
    pub outside_width: f32,
    pub checkpoints: Vec<Vec2>,
    pub laps: u32,
    pub apples: u32,
    pub cacti: u32,
    pub bombs: u32,
    pub shields: u32,
}

impl TrackDef {
    pub fn build_track(&self) -> Track {
        Track::new(
            self.points.clone(),
            self.road_width,
            self.outside_width,
            self.checkpoints.clone(),
        )
    }
}

fn oval_circuit() -> TrackDef {
    let mut points = Vec::with_capacity(32);
    // Stadium oval: 32 samples of a squashed ellipse around (0, 0)
    for i in 0..32 {
        let a = (i as f32 / 32.0) * std::f32::consts::TAU;
        points.push(Vec2::new(a.cos() * 900.0, a.sin() * 520.0));
    }
    let checkpoints = vec![
        Vec2::new(900.0, 0.0),
        Vec2::new(0.0, 520.0),
        Vec2::new(-900.0, 0.0),
        Vec2::new(0.0, -520.0),
    ];
    TrackDef {
        name: "oval",
        points,
        road_width: 70.0,
        outside_width: 120.0,
        checkpoints,
        laps: 3,
        apples: 6,
        cacti: 3,
        bombs: 2,
        shields: 1,
    }
}

fn canyon_circuit() -> TrackDef {
    let points = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(700.0, -60.0),
        Vec2::new(1100.0, 160.0),
        Vec2::new(1250.0, 560.0),
        Vec2::new(1000.0, 880.0),
        Vec2::new(560.0, 960.0),
        Vec2::new(160.0, 820.0),
        Vec2::new(-220.0, 560.0),
        Vec2::new(-300.0, 240.0),
        Vec2::new(-160.0, 40.0),
    ];
    let checkpoints = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1100.0, 160.0),
        Vec2::new(1000.0, 880.0),
        Vec2::new(-220.0, 560.0),
    ];
    TrackDef {
        name: "canyon",
        points,
        road_width: 60.0,
        outside_width: 105.0,
        checkpoints,
        laps: 3,
        apples: 8,
        cacti: 4,
        bombs: 3,
        shields: 2,
    }
}

/// Look up a built-in track definition by name
pub fn track_def(name: &str) -> Option<TrackDef> {
    match name.to_lowercase().as_str() {
        "oval" => Some(oval_circuit()),
        "canyon" => Some(canyon_circuit()),
        _ => None,
    }
}

pub fn track_names() -> &'static [&'static str] {
    &["oval", "canyon"]
}

/// Tuned profile for a racer kind
pub fn racer_profile(kind: RacerKind) -> RacerProfile {
    let base = RacerProfile::default();
    match kind {
        RacerKind::Default => base,
        RacerKind::Speedster => RacerProfile {
            max_speed: 185.0,
            accel: 190.0,
            turn_rate: 2.4,
            brake_angle: 0.7,
            venom: VenomConfig {
                range: 130.0,
                cooldown_ms: 2800.0,
                ..VenomConfig::default()
            },
            ..base.clone()
        },
        RacerKind::Bully => RacerProfile {
            max_speed: 150.0,
            accel: 240.0,
            turn_rate: 2.2,
            offroad_penalty: 0.72,
            base_segments: 8,
            venom: VenomConfig {
                range: 110.0,
                slow_mul: 0.8,
                ..VenomConfig::default()
            },
            ..base.clone()
        },
        RacerKind::Trickster => RacerProfile {
            max_speed: 160.0,
            turn_rate: 3.0,
            steer_gain: 1.5,
            look_ahead: 100.0,
            venom: VenomConfig {
                cooldown_ms: 2000.0,
                duration_ms: 1600.0,
                ..VenomConfig::default()
            },
            ..base.clone()
        },
        RacerKind::CrossAccel => RacerProfile {
            max_speed: 158.0,
            accel: 220.0,
            never_stop: true,
            venom: VenomConfig {
                range: 170.0,
                speed: 380.0,
                ..VenomConfig::default()
            },
            ..base
        },
    }
}

fn racer_color(slot: usize) -> u32 {
    const PALETTE: [u32; 8] = [
        0xe04040, 0x40a0e0, 0x50c878, 0xe0b040, 0xb060e0, 0xe07030, 0x30c0c0, 0xd050a0,
    ];
    PALETTE[slot % PALETTE.len()]
}

/// One entry in a race lineup
#[derive(Debug, Clone, Copy)]
pub struct LineupEntry {
    pub kind: RacerKind,
    pub is_player: bool,
}

/// Assemble a ready-to-tick world: track, staggered grid behind the start
/// line, item spawns. The world starts in its countdown phase.
pub fn build_race(def: &TrackDef, lineup: &[LineupEntry], seed: u64, now_ms: f64) -> RaceWorld {
    let track = def.build_track();
    let mut world = RaceWorld::new(track, def.laps, seed, now_ms);

    let total = world.track.total_length.max(1.0);
    for (slot, entry) in lineup.iter().enumerate() {
        // Rows of two, walking backwards from the start line
        let row = (slot / 2) as f32;
        let side = if slot % 2 == 0 { -1.0 } else { 1.0 };
        let back_t = 1.0 - ((row + 1.0) * 40.0) / total;
        let (pos, heading) = match world.track.sample_track(back_t) {
            Some(sample) => {
                let normal = Vec2::new(-sample.tangent.y, sample.tangent.x);
                (
                    sample.point + normal * side * world.track.road_width * 0.35,
                    sample.tangent.to_angle(),
                )
            }
            None => (Vec2::new(slot as f32 * 30.0, 0.0), 0.0),
        };
        world.add_racer(
            entry.kind,
            racer_profile(entry.kind),
            pos,
            heading,
            entry.is_player,
            racer_color(slot),
        );
    }

    spawn_items(&mut world, def.apples, def.cacti, def.bombs, def.shields);
    log::info!(
        "built race on '{}': {} racers, {} laps, countdown {:.0}ms",
        def.name,
        world.racers.len(),
        world.total_laps,
        COUNTDOWN_MS
    );
    world
}
