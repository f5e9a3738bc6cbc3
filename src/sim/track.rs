//! Track geometry and projection
//!
//! The track is an immutable closed polyline. Everything else in the sim
//! reasons about positions through `project_on_track`: nearest centerline
//! point, lateral offset, and a longitudinal fraction `t_norm` in [0, 1)
//! measured by cumulative arc length from checkpoint 0.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::mod1;

/// Immutable closed track: centerline points plus derived metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Centerline polyline; the last point implicitly connects to the first
    pub points: Vec<Vec2>,
    /// Half-width of the paved road (lateral distance from centerline)
    pub road_width: f32,
    /// Half-width of the drivable area including the verge
    pub outside_width: f32,
    /// Checkpoint positions; index 0 is the start/finish line
    pub checkpoints: Vec<Vec2>,
    /// Track fraction of each checkpoint, rebased so checkpoint 0 is 0.0
    pub checkpoint_ts: Vec<f32>,
    /// Cumulative arc length at each point (len = points + 1, last = total)
    cum_lengths: Vec<f32>,
    /// Sum of all segment lengths
    pub total_length: f32,
    /// Raw fraction (from points[0]) of checkpoint 0, used to rebase t_norm
    start_t: f32,
}

/// Result of projecting a world position onto the track centerline
#[derive(Debug, Clone, Copy)]
pub struct TrackProjection {
    /// Nearest point on the centerline
    pub point: Vec2,
    /// Unit tangent (forward direction) at that point
    pub tangent: Vec2,
    /// Unit left normal at that point
    pub normal: Vec2,
    /// Signed lateral offset along the normal (positive = left of travel)
    pub lateral: f32,
    /// Unsigned distance from the centerline point
    pub distance: f32,
    /// Longitudinal fraction in [0, 1), measured from checkpoint 0
    pub t_norm: f32,
}

/// A sampled centerline point with its forward direction
#[derive(Debug, Clone, Copy)]
pub struct TrackSample {
    pub point: Vec2,
    pub tangent: Vec2,
}

impl Track {
    /// Build a track from a closed point loop and checkpoint positions.
    ///
    /// Degenerate input (fewer than 3 points, no checkpoints) still yields a
    /// track object, but projection returns `None` and the sim treats it as
    /// a no-op surface.
    pub fn new(
        points: Vec<Vec2>,
        road_width: f32,
        outside_width: f32,
        checkpoints: Vec<Vec2>,
    ) -> Self {
        if points.len() < 3 || checkpoints.is_empty() {
            log::warn!(
                "degenerate track: {} points, {} checkpoints",
                points.len(),
                checkpoints.len()
            );
        }

        let n = points.len();
        let mut cum_lengths = Vec::with_capacity(n + 1);
        let mut total = 0.0_f32;
        cum_lengths.push(0.0);
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            total += (b - a).length();
            cum_lengths.push(total);
        }

        let mut track = Self {
            points,
            road_width,
            outside_width: outside_width.max(road_width),
            checkpoints,
            checkpoint_ts: Vec::new(),
            cum_lengths,
            total_length: total,
            start_t: 0.0,
        };

        // Rebase t_norm so checkpoint 0 sits at fraction 0
        track.start_t = track
            .checkpoints
            .first()
            .and_then(|&cp| track.project_raw(cp))
            .map(|raw| raw.t_norm)
            .unwrap_or(0.0);
        track.checkpoint_ts = track
            .checkpoints
            .iter()
            .map(|&cp| {
                track
                    .project_raw(cp)
                    .map(|raw| mod1(raw.t_norm - track.start_t))
                    .unwrap_or(0.0)
            })
            .collect();

        track
    }

    /// Project raw (t measured from points[0], no rebase)
    fn project_raw(&self, pos: Vec2) -> Option<TrackProjection> {
        let n = self.points.len();
        if n < 3 || self.total_length <= f32::EPSILON {
            return None;
        }

        let mut best: Option<(f32, f32, Vec2, Vec2)> = None; // (dist_sq, arc, foot, tangent)
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let ab = b - a;
            let len_sq = ab.length_squared();
            if len_sq < 1e-6 {
                continue;
            }
            let t = ((pos - a).dot(ab) / len_sq).clamp(0.0, 1.0);
            let foot = a + ab * t;
            let dist_sq = (pos - foot).length_squared();
            let arc = self.cum_lengths[i] + ab.length() * t;

            let better = match best {
                None => true,
                // Tie-break equal-distance candidates by lowest arc length
                Some((bd, ba, _, _)) => {
                    dist_sq < bd - 1e-4 || ((dist_sq - bd).abs() <= 1e-4 && arc < ba)
                }
            };
            if better {
                best = Some((dist_sq, arc, foot, ab / ab.length()));
            }
        }

        let (dist_sq, arc, foot, tangent) = best?;
        let normal = Vec2::new(-tangent.y, tangent.x);
        let offset = pos - foot;
        Some(TrackProjection {
            point: foot,
            tangent,
            normal,
            lateral: offset.dot(normal),
            distance: dist_sq.sqrt(),
            t_norm: mod1(arc / self.total_length),
        })
    }

    /// Nearest centerline point for a world position, with lateral offset and
    /// longitudinal fraction. `None` on a degenerate track.
    pub fn project_on_track(&self, pos: Vec2) -> Option<TrackProjection> {
        let mut proj = self.project_raw(pos)?;
        proj.t_norm = mod1(proj.t_norm - self.start_t);
        Some(proj)
    }

    /// Interpolated centerline point and tangent at fraction `t` (wrapping)
    pub fn sample_track(&self, t: f32) -> Option<TrackSample> {
        let n = self.points.len();
        if n < 3 || self.total_length <= f32::EPSILON {
            return None;
        }

        let arc = mod1(t + self.start_t) * self.total_length;
        // cum_lengths is sorted; find the edge containing this arc length
        let mut i = match self
            .cum_lengths
            .binary_search_by(|c| c.partial_cmp(&arc).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        if i >= n {
            i = n - 1;
        }

        let a = self.points[i];
        let b = self.points[(i + 1) % n];
        let seg_len = (b - a).length();
        if seg_len < 1e-6 {
            return Some(TrackSample {
                point: a,
                tangent: Vec2::X,
            });
        }
        let along = (arc - self.cum_lengths[i]).clamp(0.0, seg_len);
        Some(TrackSample {
            point: a + (b - a) * (along / seg_len),
            tangent: (b - a) / seg_len,
        })
    }

    /// Non-negative forward fraction from `from_t` to `to_t`, wrapping
    /// through 0. Used for every "is this ahead of me" query.
    #[inline]
    pub fn forward_track_delta(from_t: f32, to_t: f32) -> f32 {
        mod1(to_t - from_t)
    }
}
