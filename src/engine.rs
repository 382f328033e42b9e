use crate::config::GameSettings;
use crate::game::Outcome;
use rand::Rng;

/// Logical board the session plays on. Terminal geometry is mapped onto
/// this space by the viewport, so resizing never moves live targets.
pub const BOARD_WIDTH: f64 = 800.0;
pub const BOARD_HEIGHT: f64 = 480.0;

pub const RIPPLE_DURATION_MS: f64 = 400.0;
const NO_GO_PROBABILITY: f64 = 0.2;
const HIT_RIPPLE_RADIUS: f64 = 50.0;
const WHIFF_RIPPLE_RADIUS: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    Go,
    NoGo,
}

/// A live circle on the board. Removed on expiry or consumption, never
/// mutated in place.
#[derive(Clone, Debug)]
pub struct Target {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub created_at_ms: f64,
    pub expires_at_ms: f64,
    pub kind: TargetKind,
}

impl Target {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt() <= self.radius
    }

    /// Fraction of the lifetime already spent, clamped to [0, 1].
    pub fn lifetime_fraction(&self, now_ms: f64) -> f64 {
        let total = self.expires_at_ms - self.created_at_ms;
        if total <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.created_at_ms) / total).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RippleKind {
    GoHit,
    NoGoHit,
    Whiff,
}

/// Transient click feedback: an outline expanding from the click point
/// over a fixed window. Purely cosmetic.
#[derive(Clone, Debug)]
pub struct Ripple {
    pub x: f64,
    pub y: f64,
    pub max_radius: f64,
    pub started_at_ms: f64,
    pub kind: RippleKind,
}

impl Ripple {
    pub fn progress(&self, now_ms: f64) -> f64 {
        ((now_ms - self.started_at_ms) / RIPPLE_DURATION_MS).clamp(0.0, 1.0)
    }

    pub fn radius(&self, now_ms: f64) -> f64 {
        self.max_radius * self.progress(now_ms)
    }

    pub fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.started_at_ms > RIPPLE_DURATION_MS
    }
}

/// Spawn/expire scheduler and hit-test resolver. Owns the live target set
/// and the ripple list; emits typed outcomes for the aggregator to apply.
#[derive(Debug, Default)]
pub struct Engine {
    pub targets: Vec<Target>,
    pub effects: Vec<Ripple>,
    last_spawn_ms: f64,
    next_id: u64,
    running: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear board state and arm the spawn clock. Supersedes any previous
    /// run entirely.
    pub fn start(&mut self, now_ms: f64) {
        self.targets.clear();
        self.effects.clear();
        self.last_spawn_ms = now_ms;
        self.running = true;
    }

    /// Idempotent: stopping an already-stopped engine is a no-op.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// One scheduler step: expire first, then spawn. A target spawned here
    /// gets `expires_at = now + lifespan`, strictly in the future, so it
    /// can never expire within the tick that created it.
    pub fn tick<R: Rng>(
        &mut self,
        now_ms: f64,
        settings: &GameSettings,
        rng: &mut R,
    ) -> Vec<Outcome> {
        if !self.running {
            return Vec::new();
        }

        let mut outcomes = Vec::new();

        self.targets.retain(|t| {
            if now_ms > t.expires_at_ms {
                // Letting a NoGo lapse was the correct action; only an
                // unclicked Go counts against the user.
                if t.kind == TargetKind::Go {
                    outcomes.push(Outcome::GoTimeout);
                }
                false
            } else {
                true
            }
        });

        if now_ms - self.last_spawn_ms > settings.spawn_interval_ms {
            self.spawn_target(now_ms, settings, rng);
            self.last_spawn_ms = now_ms;
        }

        self.effects.retain(|e| !e.expired(now_ms));

        outcomes
    }

    fn spawn_target<R: Rng>(&mut self, now_ms: f64, settings: &GameSettings, rng: &mut R) {
        let radius = rng.gen_range(settings.target_min_radius..=settings.target_max_radius);
        let x = rng.gen_range(radius..(BOARD_WIDTH - radius));
        let y = rng.gen_range(radius..(BOARD_HEIGHT - radius));
        let kind = if rng.gen_bool(NO_GO_PROBABILITY) {
            TargetKind::NoGo
        } else {
            TargetKind::Go
        };

        self.next_id += 1;
        self.targets.push(Target {
            id: self.next_id,
            x,
            y,
            radius,
            created_at_ms: now_ms,
            expires_at_ms: now_ms + settings.target_lifespan_ms,
            kind,
        });
    }

    /// Resolve one pointer-down against the live set: first match in
    /// insertion order wins, and at most one target is consumed. A click
    /// that lands on nothing still leaves a ripple.
    pub fn pointer_down(&mut self, x: f64, y: f64, now_ms: f64) -> Option<Outcome> {
        let hit_index = self.targets.iter().position(|t| t.contains(x, y));

        let outcome = hit_index.map(|idx| {
            let target = self.targets.remove(idx);
            match target.kind {
                TargetKind::Go => Outcome::Hit {
                    response_ms: now_ms - target.created_at_ms,
                },
                TargetKind::NoGo => Outcome::NoGoClick,
            }
        });

        let kind = match outcome {
            Some(Outcome::Hit { .. }) => RippleKind::GoHit,
            Some(Outcome::NoGoClick) => RippleKind::NoGoHit,
            _ => RippleKind::Whiff,
        };
        self.effects.push(Ripple {
            x,
            y,
            max_radius: if outcome.is_some() {
                HIT_RIPPLE_RADIUS
            } else {
                WHIFF_RIPPLE_RADIUS
            },
            started_at_ms: now_ms,
            kind,
        });

        outcome
    }
}
