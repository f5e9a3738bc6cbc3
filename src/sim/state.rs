//! Race state and core simulation types
//!
//! Everything a snapshot must carry for broadcast/injection lives here.
//! Cross-racer references are ids, never indices into another racer's data.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::track::{Track, TrackProjection};
use crate::consts::*;

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Pre-start countdown; bodies form but nobody moves
    Countdown,
    /// Active racing
    Running,
    /// Every racer has crossed the line
    Finished,
}

/// Lateral classification of a racer's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Surface {
    #[default]
    Road,
    /// Between road edge and the verge; reduced max speed
    Offroad,
    /// Past the verge; heavily reduced and AI steers hard back in
    Outside,
}

/// Behavioral variant of a racer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RacerKind {
    #[default]
    Default,
    /// Shoulders around body blocks instead of stopping on them
    Speedster,
    /// Pushes opponents on contact and shrugs off collision penalties
    Bully,
    /// Bites tail segments off other racers
    Trickster,
    /// Gains a speed boost when crossing a body instead of slowing
    CrossAccel,
}

/// Per-racer venom tuning, clamped into sane bands before use
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VenomConfig {
    pub range: f32,
    pub cooldown_ms: f64,
    pub slow_mul: f32,
    pub duration_ms: f64,
    pub speed: f32,
}

impl Default for VenomConfig {
    fn default() -> Self {
        Self {
            range: 150.0,
            cooldown_ms: 2400.0,
            slow_mul: 0.86,
            duration_ms: VENOM_SLOW_BASE_DURATION_MS,
            speed: VENOM_PROJECTILE_SPEED,
        }
    }
}

impl VenomConfig {
    /// Clamp every field into its allowed band
    pub fn clamped(&self) -> Self {
        Self {
            range: self.range.clamp(90.0, 260.0),
            cooldown_ms: self.cooldown_ms.clamp(900.0, 6000.0),
            slow_mul: self.slow_mul.clamp(0.65, 0.95),
            duration_ms: self.duration_ms.clamp(800.0, 4200.0),
            speed: self.speed.clamp(240.0, 520.0),
        }
    }
}

/// Stats/profile record consumed from the racer catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacerProfile {
    pub max_speed: f32,
    /// Acceleration toward target speed (units/s²)
    pub accel: f32,
    /// Turn rate at full stick (radians/s)
    pub turn_rate: f32,
    /// Max-speed multiplier while offroad
    pub offroad_penalty: f32,
    /// Max-speed multiplier while outside the verge
    pub outside_penalty: f32,
    /// Steering gain applied to heading error
    pub steer_gain: f32,
    /// Heading error (radians) beyond which the AI brakes
    pub brake_angle: f32,
    /// Base look-ahead distance for AI target sampling
    pub look_ahead: f32,
    /// Never-stop policy: effective speed floored above zero
    pub never_stop: bool,
    /// Starting body segment count
    pub base_segments: u32,
    pub venom: VenomConfig,
}

impl Default for RacerProfile {
    fn default() -> Self {
        Self {
            max_speed: 165.0,
            accel: 210.0,
            turn_rate: 2.6,
            offroad_penalty: 0.62,
            outside_penalty: 0.4,
            steer_gain: 1.35,
            brake_angle: 0.62,
            look_ahead: 120.0,
            never_stop: false,
            base_segments: 6,
            venom: VenomConfig::default(),
        }
    }
}

/// Timed buff/debuff kinds; at most one of each kind is active at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    VenomSlow,
    BombSlow,
    Shield,
}

/// A timed effect attached to a racer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub until_ms: f64,
    /// Speed multiplier payload (1.0 for non-slow effects)
    pub speed_mul: f32,
}

/// One motion-history sample, newest first
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistorySample {
    pub pos: Vec2,
    pub heading: f32,
}

/// One derived trailing body segment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BodySegment {
    pub pos: Vec2,
    pub heading: f32,
    pub radius: f32,
}

/// Body items grow (apple) or shrink (cactus) a racer on contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyItemKind {
    Apple,
    Cactus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyItem {
    pub pos: Vec2,
    pub kind: BodyItemKind,
    pub radius: f32,
    pub active: bool,
    /// When an inactive item may respawn at a new track position
    pub respawn_at_ms: f64,
}

/// Pickup kinds; bombs are hazards, shields are defensive charges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Bomb,
    Shield,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub pos: Vec2,
    pub kind: PickupKind,
    pub active: bool,
    pub respawn_at_ms: f64,
}

/// A venom projectile in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenomShot {
    pub owner_id: u32,
    pub pos: Vec2,
    /// Unit travel direction, fixed at fire time
    pub dir: Vec2,
    pub speed: f32,
    pub radius: f32,
    pub born_at_ms: f64,
    pub max_life_ms: f64,
    pub max_travel_dist: f32,
    pub traveled_dist: f32,
    pub duration_ms: f64,
    pub slow_mul: f32,
    /// Owner color, presentation hint only
    pub color: u32,
}

/// Per-tick control input for one racer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// [0, 1]
    pub throttle: f32,
    /// [0, 1]
    pub brake: f32,
    /// [-1, 1]
    pub turn: f32,
    /// Request a venom shot this tick
    pub spit: bool,
}

impl ControlInput {
    pub fn clamped(&self) -> Self {
        Self {
            throttle: self.throttle.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
            turn: self.turn.clamp(-1.0, 1.0),
            spit: self.spit,
        }
    }
}

/// One standings row, recomputed every tick from live racer state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standing {
    pub racer_id: u32,
    /// 1-based rank
    pub rank: u32,
    /// Total race progress in [0, 1] (laps + current lap fraction)
    pub progress: f32,
    pub finished: bool,
    pub finish_time_ms: Option<f64>,
}

/// One racer: head pose, body bookkeeping, effects and cooldowns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Racer {
    pub id: u32,
    pub kind: RacerKind,
    pub profile: RacerProfile,
    pub is_player: bool,
    /// Presentation hint only
    pub color: u32,

    pub pos: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub surface: Surface,

    /// Motion history, newest first; segments are derived from it
    pub history: Vec<HistorySample>,
    /// Derived trailing segments (refreshed each tick)
    pub segments: Vec<BodySegment>,
    /// Live segment count; never drops below `MIN_BODY_SEGMENTS`
    pub segment_count: u32,

    pub effects: Vec<Effect>,
    pub shield_charges: u32,

    /// Hunger clock driving AI apple attraction and starvation shedding
    pub exhaustion_steps: u32,
    pub hunger_next_step_at_ms: f64,

    pub next_checkpoint: usize,
    pub laps: u32,
    pub finished: bool,
    pub finish_time_ms: Option<f64>,

    // Cooldown timestamps; "active" means the timestamp is in the future
    pub impact_until_ms: f64,
    pub tail_bite_until_ms: f64,
    pub next_venom_at_ms: f64,
    pub next_body_cross_at_ms: f64,
    pub unstuck_until_ms: f64,

    /// Stall watchdog start time, if currently below the stall threshold
    pub stall_since_ms: Option<f64>,

    /// Cached projection from the latest kinematics step
    #[serde(skip)]
    pub last_projection: Option<TrackProjection>,
}

impl Racer {
    pub fn new(id: u32, kind: RacerKind, profile: RacerProfile, pos: Vec2, heading: f32) -> Self {
        let segment_count = profile.base_segments.clamp(MIN_BODY_SEGMENTS, MAX_BODY_SEGMENTS);
        Self {
            id,
            kind,
            profile,
            is_player: false,
            color: 0xffffff,
            pos,
            heading,
            speed: 0.0,
            surface: Surface::Road,
            history: vec![HistorySample { pos, heading }],
            segments: Vec::new(),
            segment_count,
            effects: Vec::new(),
            shield_charges: 0,
            exhaustion_steps: 0,
            hunger_next_step_at_ms: 0.0,
            next_checkpoint: 1,
            laps: 0,
            finished: false,
            finish_time_ms: None,
            impact_until_ms: 0.0,
            tail_bite_until_ms: 0.0,
            next_venom_at_ms: 0.0,
            next_body_cross_at_ms: 0.0,
            unstuck_until_ms: 0.0,
            stall_since_ms: None,
            last_projection: None,
        }
    }

    /// Add an effect; a duplicate kind refreshes/overrides rather than stacks
    pub fn add_effect(&mut self, kind: EffectKind, duration_ms: f64, now_ms: f64, speed_mul: f32) {
        self.effects.retain(|e| e.kind != kind);
        self.effects.push(Effect {
            kind,
            until_ms: now_ms + duration_ms,
            speed_mul,
        });
    }

    pub fn remove_effect(&mut self, kind: EffectKind) {
        self.effects.retain(|e| e.kind != kind);
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    /// Drop effects whose expiry has passed
    pub fn expire_effects(&mut self, now_ms: f64) {
        self.effects.retain(|e| e.until_ms > now_ms);
    }

    /// Composed speed multiplier of all active effects.
    /// Distinct kinds compose multiplicatively; same-kind never stacks
    /// because `add_effect` overrides.
    pub fn effect_speed_multiplier(&self) -> f32 {
        self.effects.iter().map(|e| e.speed_mul).product()
    }

    /// Type-scaled speed ceiling; cross-accelerators get boost headroom
    pub fn speed_ceiling(&self) -> f32 {
        let scale = match self.kind {
            RacerKind::CrossAccel => CROSS_ACCEL_SPEED_CAP,
            _ => 1.05,
        };
        self.profile.max_speed * scale
    }

    /// Floor the speed for never-stop racers so they cannot soft-lock
    pub fn ensure_always_move_speed(&mut self) {
        if self.profile.never_stop && !self.finished {
            self.speed = self.speed.max(ALWAYS_MOVE_MIN_SPEED);
        }
    }

    /// Whether collision/crossing rules skip this racer right now
    #[inline]
    pub fn in_unstuck_grace(&self, now_ms: f64) -> bool {
        now_ms < self.unstuck_until_ms
    }

    /// Tail segment, if the body has formed
    pub fn tail_segment(&self) -> Option<&BodySegment> {
        self.segments.last()
    }
}

fn default_rng() -> Pcg32 {
    Pcg32::seed_from_u64(0)
}

/// Complete race world: the single owned aggregate every sub-system call
/// takes by reference. Serializable for snapshot broadcast/injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceWorld {
    /// Run seed for reproducible item placement
    pub seed: u64,
    #[serde(skip, default = "default_rng")]
    pub rng: Pcg32,

    pub track: Track,
    pub racers: Vec<Racer>,
    pub body_items: Vec<BodyItem>,
    pub pickups: Vec<Pickup>,
    pub venom_shots: Vec<VenomShot>,

    pub phase: RacePhase,
    pub total_laps: u32,
    pub countdown_until_ms: f64,
    pub race_start_ms: f64,
    /// Global grace window during which body-crossing rules are suspended
    pub body_crossing_grace_until_ms: f64,

    pub standings: Vec<Standing>,

    next_racer_id: u32,
}

impl RaceWorld {
    pub fn new(track: Track, total_laps: u32, seed: u64, now_ms: f64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            track,
            racers: Vec::new(),
            body_items: Vec::new(),
            pickups: Vec::new(),
            venom_shots: Vec::new(),
            phase: RacePhase::Countdown,
            total_laps: total_laps.max(1),
            countdown_until_ms: now_ms + COUNTDOWN_MS,
            race_start_ms: now_ms + COUNTDOWN_MS,
            body_crossing_grace_until_ms: now_ms + COUNTDOWN_MS + 1500.0,
            standings: Vec::new(),
            next_racer_id: 1,
        }
    }

    /// Allocate a racer id and add the racer to the grid
    pub fn add_racer(
        &mut self,
        kind: RacerKind,
        profile: RacerProfile,
        pos: Vec2,
        heading: f32,
        is_player: bool,
        color: u32,
    ) -> u32 {
        let id = self.next_racer_id;
        self.next_racer_id += 1;
        let mut racer = Racer::new(id, kind, profile, pos, heading);
        racer.is_player = is_player;
        racer.color = color;
        self.racers.push(racer);
        id
    }

    pub fn racer_by_id(&self, id: u32) -> Option<&Racer> {
        self.racers.iter().find(|r| r.id == id)
    }

    /// Full-state override from a network snapshot. Replaces everything and
    /// reseeds the (non-serialized) RNG so later respawns stay reproducible
    /// from the snapshot's seed.
    pub fn apply_snapshot(&mut self, snapshot: RaceWorld) {
        log::info!("applying full-state snapshot ({} racers)", snapshot.racers.len());
        *self = snapshot;
        self.rng = Pcg32::seed_from_u64(self.seed);
    }

    /// Grant every racer an unstuck grace window (used after teleport-style
    /// corrections such as a snapshot override)
    pub fn grant_unstuck_grace(&mut self, now_ms: f64) {
        for racer in &mut self.racers {
            racer.unstuck_until_ms = now_ms + UNSTUCK_GRACE_MS;
        }
    }
}
