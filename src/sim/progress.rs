//! Checkpoint progress, lap counting and live standings
//!
//! Checkpoints must be hit in order; a pass either comes within the pass
//! radius or crosses the checkpoint's track fraction. Standings are
//! recomputed from scratch every tick, so they're always consistent with the
//! racer state they're derived from.

use super::state::{RaceWorld, Standing};
use super::track::Track;
use crate::consts::*;

/// Advance each racer's next-checkpoint cursor and close laps
pub fn update_checkpoint_progress(world: &mut RaceWorld, now_ms: f64) {
    let total_laps = world.total_laps;
    let cp_count = world.track.checkpoints.len();
    if cp_count == 0 {
        return;
    }

    for racer in &mut world.racers {
        if racer.finished {
            continue;
        }
        let idx = racer.next_checkpoint % cp_count;
        let target = world.track.checkpoints[idx];
        let target_t = world.track.checkpoint_ts[idx];

        let near = (racer.pos - target).length() <= CHECKPOINT_PASS_RADIUS;
        // A fast racer can cross the line between ticks without ever being
        // inside the radius; just-past on the track fraction also counts
        let crossed = racer
            .last_projection
            .map(|proj| Track::forward_track_delta(target_t, proj.t_norm) < 0.02)
            .unwrap_or(false);
        if !near && !crossed {
            continue;
        }

        if idx == 0 {
            racer.laps += 1;
            log::info!("racer {} completed lap {}/{}", racer.id, racer.laps, total_laps);
            if racer.laps >= total_laps {
                racer.finished = true;
                racer.finish_time_ms = Some(now_ms);
                log::info!("racer {} finished at t={:.0}ms", racer.id, now_ms);
                continue;
            }
        }
        racer.next_checkpoint = (idx + 1) % cp_count;
    }
}

/// Lap fraction in [0, 1) anchored to the last checkpoint actually passed,
/// so track-fraction jitter around the line can't inflate a racer's progress
fn lap_fraction(world: &RaceWorld, racer_idx: usize) -> f32 {
    let racer = &world.racers[racer_idx];
    let cp_count = world.track.checkpoints.len();
    if cp_count == 0 {
        return 0.0;
    }
    let next_idx = racer.next_checkpoint % cp_count;
    let prev_idx = (next_idx + cp_count - 1) % cp_count;
    let prev_t = world.track.checkpoint_ts[prev_idx];
    let next_t = world.track.checkpoint_ts[next_idx];

    let Some(t) = racer
        .last_projection
        .map(|p| p.t_norm)
        .or_else(|| world.track.project_on_track(racer.pos).map(|p| p.t_norm))
    else {
        return 0.0;
    };

    let leg = Track::forward_track_delta(prev_t, next_t);
    let raw = Track::forward_track_delta(prev_t, t);
    // More than half a lap "ahead" of the anchor means the racer is actually
    // behind it (e.g. spawned short of the start line)
    let along = if raw > 0.5 { 0.0 } else { raw.min(leg) };
    (prev_t + along).min(1.0)
}

/// Rebuild the standings table: finishers by finish time, then everyone else
/// by race progress, ties broken by ascending racer id.
pub fn compute_standings(world: &mut RaceWorld) {
    let total_laps = world.total_laps.max(1) as f32;
    let mut rows: Vec<(usize, Standing)> = world
        .racers
        .iter()
        .enumerate()
        .map(|(idx, racer)| {
            let progress = if racer.finished {
                1.0
            } else {
                ((racer.laps as f32 + lap_fraction(world, idx)) / total_laps).min(1.0)
            };
            (
                idx,
                Standing {
                    racer_id: racer.id,
                    rank: 0,
                    progress,
                    finished: racer.finished,
                    finish_time_ms: racer.finish_time_ms,
                },
            )
        })
        .collect();

    rows.sort_by(|(_, a), (_, b)| {
        match (a.finished, b.finished) {
            (true, false) => return std::cmp::Ordering::Less,
            (false, true) => return std::cmp::Ordering::Greater,
            (true, true) => {
                let at = a.finish_time_ms.unwrap_or(f64::MAX);
                let bt = b.finish_time_ms.unwrap_or(f64::MAX);
                return at
                    .partial_cmp(&bt)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.racer_id.cmp(&b.racer_id));
            }
            (false, false) => {}
        }
        b.progress
            .partial_cmp(&a.progress)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.racer_id.cmp(&b.racer_id))
    });

    world.standings = rows
        .into_iter()
        .enumerate()
        .map(|(pos, (_, mut standing))| {
            standing.rank = pos as u32 + 1;
            standing
        })
        .collect();
}
