//! Trailing body bookkeeping
//!
//! A racer's body is not simulated; it is derived. Each tick the head pose is
//! sampled into a motion history, and the live segment count is laid out
//! along that history at a fixed arc spacing. Segment count changes go
//! through `apply_body_segment_delta`, which enforces the minimum floor.

use serde::{Deserialize, Serialize};

use super::state::{BodySegment, HistorySample, Racer, RaceWorld};
use crate::consts::*;
use crate::{normalize_angle, shortest_angle};

/// Why a segment count changed; used for effect bookkeeping only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentChangeReason {
    Bite,
    Cactus,
    Apple,
    Starve,
}

/// Max history samples worth keeping: enough arc length for a full-size body
fn history_cap() -> usize {
    ((MAX_BODY_SEGMENTS as f32 * SEGMENT_SPACING) / HISTORY_SAMPLE_DIST) as usize + 8
}

/// Record the current head pose into the motion history (newest first).
/// Small movements update the newest sample in place instead of growing it.
pub fn record_history(racer: &mut Racer) {
    let sample = HistorySample {
        pos: racer.pos,
        heading: racer.heading,
    };
    match racer.history.first() {
        Some(head) if (racer.pos - head.pos).length() < HISTORY_SAMPLE_DIST => {
            racer.history[0] = sample;
        }
        _ => {
            racer.history.insert(0, sample);
            let cap = history_cap();
            if racer.history.len() > cap {
                racer.history.truncate(cap);
            }
        }
    }
}

/// Lay out `segment_count` segments along the history so segment N trails
/// the head by (N+1) * spacing of arc length.
pub fn rebuild_segments(racer: &mut Racer) {
    racer.segments.clear();
    if racer.history.is_empty() {
        return;
    }

    let mut target = SEGMENT_SPACING;
    let mut walked = 0.0_f32;
    let mut i = 0usize;

    for _ in 0..racer.segment_count {
        // Advance along history until `walked` spans the target arc length
        while i + 1 < racer.history.len() {
            let a = racer.history[i];
            let b = racer.history[i + 1];
            let step = (b.pos - a.pos).length();
            if walked + step >= target {
                break;
            }
            walked += step;
            i += 1;
        }

        let segment = if i + 1 < racer.history.len() {
            let a = racer.history[i];
            let b = racer.history[i + 1];
            let step = (b.pos - a.pos).length().max(1e-4);
            let t = ((target - walked) / step).clamp(0.0, 1.0);
            BodySegment {
                pos: a.pos + (b.pos - a.pos) * t,
                heading: normalize_angle(a.heading + shortest_angle(a.heading, b.heading) * t),
                radius: SEGMENT_RADIUS,
            }
        } else {
            // History shorter than the body; stack remaining segments on the
            // oldest sample (happens right after spawn)
            let last = racer.history[racer.history.len() - 1];
            BodySegment {
                pos: last.pos,
                heading: last.heading,
                radius: SEGMENT_RADIUS,
            }
        };
        racer.segments.push(segment);
        target += SEGMENT_SPACING;
    }
}

/// Per-tick body bookkeeping for every racer
pub fn update_body_segments_for_race(world: &mut RaceWorld) {
    for racer in &mut world.racers {
        record_history(racer);
        rebuild_segments(racer);
    }
}

/// Change the live segment count. Returns whether the change was applied;
/// a decrement that would drop the count below the floor is denied.
pub fn apply_body_segment_delta(
    racer: &mut Racer,
    delta: i32,
    _now_ms: f64,
    reason: SegmentChangeReason,
) -> bool {
    let current = racer.segment_count as i64;
    let proposed = current + delta as i64;
    if delta < 0 && proposed < MIN_BODY_SEGMENTS as i64 {
        return false;
    }
    let new_count = proposed.clamp(MIN_BODY_SEGMENTS as i64, MAX_BODY_SEGMENTS as i64) as u32;
    if new_count == racer.segment_count {
        return false;
    }
    log::debug!(
        "racer {} segments {} -> {} ({:?})",
        racer.id,
        racer.segment_count,
        new_count,
        reason
    );
    racer.segment_count = new_count;
    true
}

/// Ease heading toward the actual motion direction when the head has been
/// displaced externally (collision separation), so the neck doesn't kink.
pub fn align_racer_heading_to_motion(racer: &mut Racer, blend: f32, min_dist: f32) {
    if racer.history.len() < 2 {
        return;
    }
    let newest = racer.history[0];
    let prev = racer.history[1];
    let delta = newest.pos - prev.pos;
    if delta.length() < min_dist {
        return;
    }
    let motion_heading = delta.y.atan2(delta.x);
    racer.heading = normalize_angle(
        racer.heading + shortest_angle(racer.heading, motion_heading) * blend.clamp(0.0, 1.0),
    );
}
