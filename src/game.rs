use crate::cognitive::{answer_for_key, CognitiveTask};
use crate::config::GameSettings;
use crate::difficulty;
use crate::engine::Engine;
use crate::util::mean;
use chrono::{DateTime, Local};
use crossterm::event::KeyCode;
use itertools::Itertools;
use std::collections::HashMap;

/// Update cadence of the event loop; also the render cadence.
pub const TICK_RATE_MS: u64 = 33;

/// Seconds of countdown shown before a session starts.
pub const COUNTDOWN_SECS: f64 = 3.0;

/// Latency charged for motor failures, and the session average when the
/// sample pool is empty. One constant for both, so an eventless session
/// reads as penalty-slow rather than impossibly fast.
pub const PENALTY_RESPONSE_MS: f64 = 2000.0;

/// History retains the most recent sessions, newest first.
pub const HISTORY_CAP: usize = 50;

const HIT_POINTS: u32 = 100;
const MISS_PENALTY: u32 = 300;
const COGNITIVE_HIT_POINTS: u32 = 200;
const COGNITIVE_MISS_PENALTY: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Countdown,
    Playing,
    Result,
}

/// Typed outcome events, applied to the aggregate in arrival order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Hit { response_ms: f64 },
    GoTimeout,
    NoGoClick,
    CognitiveHit { response_ms: f64 },
    CognitiveMiss { response_ms: f64 },
}

/// One finished (or in-flight) training session record.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Local>,
    pub ended_at: Option<DateTime<Local>>,
    pub score: u32,
    pub total_targets: u32,
    pub hits: u32,
    pub misses: u32,
    pub cognitive_hits: u32,
    pub cognitive_misses: u32,
    pub avg_response_ms: f64,
}

impl Session {
    fn begin() -> Self {
        let now = Local::now();
        Self {
            id: now.timestamp_millis().to_string(),
            started_at: now,
            ended_at: None,
            score: 0,
            total_targets: 0,
            hits: 0,
            misses: 0,
            cognitive_hits: 0,
            cognitive_misses: 0,
            avg_response_ms: 0.0,
        }
    }

    pub fn accuracy(&self) -> u32 {
        crate::util::percentage(self.hits, self.total_targets)
    }

    pub fn cognitive_accuracy(&self) -> u32 {
        crate::util::percentage(
            self.cognitive_hits,
            self.cognitive_hits + self.cognitive_misses,
        )
    }
}

/// The session aggregator: owns the status machine, the live counters,
/// the response-time pool, the settings the difficulty controller works
/// on, and the engine itself. Everything external observes the game
/// through this struct.
#[derive(Debug)]
pub struct Game {
    pub status: Status,
    pub score: u32,
    pub hits: u32,
    pub misses: u32,
    pub cognitive_hits: u32,
    pub cognitive_misses: u32,
    pub response_times: Vec<f64>,
    /// (elapsed secs, response ms) raw samples for the result chart
    pub rt_samples: Vec<(f64, f64)>,
    /// per-second mean response times, reduced at finalization
    pub rt_coords: Vec<(f64, f64)>,
    pub session: Option<Session>,
    pub history: Vec<Session>,
    pub settings: GameSettings,
    pub current_task: Option<CognitiveTask>,
    pub engine: Engine,
    pub countdown_remaining: f64,
    pub seconds_remaining: f64,
    baseline: GameSettings,
    session_epoch_ms: f64,
}

impl Game {
    pub fn new(baseline: GameSettings) -> Self {
        Self {
            status: Status::Idle,
            score: 0,
            hits: 0,
            misses: 0,
            cognitive_hits: 0,
            cognitive_misses: 0,
            response_times: Vec::new(),
            rt_samples: Vec::new(),
            rt_coords: Vec::new(),
            session: None,
            history: Vec::new(),
            settings: baseline.clone(),
            current_task: None,
            engine: Engine::new(),
            countdown_remaining: 0.0,
            seconds_remaining: 0.0,
            baseline,
            session_epoch_ms: 0.0,
        }
    }

    /// Idle or Result -> Countdown. Any leftover loop state from a
    /// previous session is superseded here.
    pub fn start_countdown(&mut self) {
        if self.status == Status::Playing {
            return;
        }
        self.engine.stop();
        self.current_task = None;
        self.countdown_remaining = COUNTDOWN_SECS;
        self.status = Status::Countdown;
    }

    /// Countdown -> Playing: counters zeroed, settings regenerated from
    /// the configured baseline, fresh session record, first task dealt.
    fn start_session(&mut self, now_ms: f64) {
        self.score = 0;
        self.hits = 0;
        self.misses = 0;
        self.cognitive_hits = 0;
        self.cognitive_misses = 0;
        self.response_times.clear();
        self.rt_samples.clear();
        self.rt_coords.clear();
        self.settings = self.baseline.at_session_start();
        self.session = Some(Session::begin());
        self.current_task = Some(CognitiveTask::generate(&mut rand::thread_rng(), now_ms));
        self.seconds_remaining = self.settings.duration_secs;
        self.session_epoch_ms = now_ms;
        self.engine.start(now_ms);
        self.status = Status::Playing;
    }

    /// Advance one tick. Returns the finalized session if the clock ran
    /// out on this tick.
    pub fn on_tick(&mut self, now_ms: f64) -> Option<Session> {
        let dt = TICK_RATE_MS as f64 / 1000.0;
        match self.status {
            Status::Countdown => {
                self.countdown_remaining -= dt;
                if self.countdown_remaining <= 0.0 {
                    self.start_session(now_ms);
                }
                None
            }
            Status::Playing => {
                self.seconds_remaining -= dt;
                if self.seconds_remaining <= 0.0 {
                    return self.end_session(now_ms);
                }
                let outcomes = self
                    .engine
                    .tick(now_ms, &self.settings, &mut rand::thread_rng());
                for outcome in outcomes {
                    self.apply(outcome, now_ms);
                }
                None
            }
            _ => None,
        }
    }

    /// Route a pointer-down (board coordinates) into the engine and fold
    /// the outcome, if any, into the aggregate. The whole resolution is
    /// one step; no other event can interleave.
    pub fn pointer_down(&mut self, x: f64, y: f64, now_ms: f64) {
        if self.status != Status::Playing {
            return;
        }
        if let Some(outcome) = self.engine.pointer_down(x, y, now_ms) {
            self.apply(outcome, now_ms);
        }
    }

    /// Interpret a key press as a parity answer. Non-answer keys are
    /// ignored; a resolved task is replaced immediately with a fresh one.
    pub fn key_down(&mut self, code: KeyCode, now_ms: f64) {
        if self.status != Status::Playing {
            return;
        }
        let Some(answer) = answer_for_key(code) else {
            return;
        };
        let Some(task) = self.current_task.take() else {
            return;
        };

        let response_ms = now_ms - task.created_at_ms;
        let outcome = if task.is_correct(answer) {
            Outcome::CognitiveHit { response_ms }
        } else {
            Outcome::CognitiveMiss { response_ms }
        };
        self.apply(outcome, now_ms);
        self.current_task = Some(CognitiveTask::generate(&mut rand::thread_rng(), now_ms));
    }

    /// Fold one typed outcome into score, counters, the response-time
    /// pool, and (for motor outcomes only) the pacing controller.
    pub fn apply(&mut self, outcome: Outcome, now_ms: f64) {
        if self.status != Status::Playing {
            return;
        }
        match outcome {
            Outcome::Hit { response_ms } => {
                self.score += HIT_POINTS;
                self.hits += 1;
                self.push_sample(response_ms, now_ms);
                difficulty::adjust(&mut self.settings, true);
            }
            Outcome::GoTimeout | Outcome::NoGoClick => {
                self.score = self.score.saturating_sub(MISS_PENALTY);
                self.misses += 1;
                self.push_sample(PENALTY_RESPONSE_MS, now_ms);
                difficulty::adjust(&mut self.settings, false);
            }
            Outcome::CognitiveHit { response_ms } => {
                self.score += COGNITIVE_HIT_POINTS;
                self.cognitive_hits += 1;
                self.push_sample(response_ms, now_ms);
            }
            Outcome::CognitiveMiss { response_ms } => {
                self.score = self.score.saturating_sub(COGNITIVE_MISS_PENALTY);
                self.cognitive_misses += 1;
                self.push_sample(response_ms, now_ms);
            }
        }
    }

    fn push_sample(&mut self, response_ms: f64, now_ms: f64) {
        self.response_times.push(response_ms);
        self.rt_samples
            .push(((now_ms - self.session_epoch_ms) / 1000.0, response_ms));
    }

    /// Playing -> Result. Finalizes exactly once: stops the loop, clears
    /// the task, computes the average (penalty value on an empty pool),
    /// and pushes the record into the capped history.
    pub fn end_session(&mut self, _now_ms: f64) -> Option<Session> {
        if self.status != Status::Playing {
            return None;
        }
        self.engine.stop();
        self.current_task = None;
        self.seconds_remaining = 0.0;
        self.rt_coords = reduce_rt_coords(&self.rt_samples);

        let avg = mean(&self.response_times).unwrap_or(PENALTY_RESPONSE_MS);
        let mut session = self.session.take()?;
        session.ended_at = Some(Local::now());
        session.score = self.score;
        session.hits = self.hits;
        session.misses = self.misses;
        session.cognitive_hits = self.cognitive_hits;
        session.cognitive_misses = self.cognitive_misses;
        session.total_targets = self.hits + self.misses;
        session.avg_response_ms = avg;

        self.history.insert(0, session.clone());
        self.history.truncate(HISTORY_CAP);
        self.session = Some(session.clone());
        self.status = Status::Result;
        Some(session)
    }

    /// Result (or Countdown) -> Idle, dropping all transients. History
    /// survives; the next session regenerates everything else.
    pub fn reset(&mut self) {
        self.engine.stop();
        self.status = Status::Idle;
        self.score = 0;
        self.hits = 0;
        self.misses = 0;
        self.cognitive_hits = 0;
        self.cognitive_misses = 0;
        self.response_times.clear();
        self.rt_samples.clear();
        self.rt_coords.clear();
        self.session = None;
        self.current_task = None;
        self.settings = self.baseline.clone();
        self.countdown_remaining = 0.0;
        self.seconds_remaining = 0.0;
    }

    pub fn countdown_digit(&self) -> u32 {
        self.countdown_remaining.ceil().max(1.0) as u32
    }

    pub fn best_score(&self) -> u32 {
        self.history.iter().map(|s| s.score).max().unwrap_or(0)
    }
}

/// Reduce raw (elapsed secs, rt) samples to a per-whole-second mean
/// series for the result chart.
fn reduce_rt_coords(samples: &[(f64, f64)]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .fold(HashMap::new(), |mut map: HashMap<String, (f64, u32)>, s| {
            let bucket = s.0.ceil().max(1.0);
            let entry = map.entry(bucket.to_string()).or_insert((0.0, 0));
            entry.0 += s.1;
            entry.1 += 1;
            map
        })
        .into_iter()
        .map(|(k, (sum, n))| (k.parse::<f64>().unwrap_or(0.0), sum / n as f64))
        .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::{MIN_SPAWN_INTERVAL_MS, MIN_TARGET_LIFESPAN_MS};
    use crate::engine::{Target, TargetKind};

    fn playing_game() -> Game {
        let mut game = Game::new(GameSettings::default());
        game.start_countdown();
        // drive the 3s countdown in 33ms ticks
        let mut now = 0.0;
        while game.status == Status::Countdown {
            now += TICK_RATE_MS as f64;
            game.on_tick(now);
        }
        assert_eq!(game.status, Status::Playing);
        game
    }

    fn plant_target(game: &mut Game, kind: TargetKind, created: f64, expires: f64) {
        game.engine.targets.push(Target {
            id: 999,
            x: 400.0,
            y: 240.0,
            radius: 30.0,
            created_at_ms: created,
            expires_at_ms: expires,
            kind,
        });
    }

    #[test]
    fn countdown_runs_three_steps_then_starts() {
        let mut game = Game::new(GameSettings::default());
        assert_eq!(game.status, Status::Idle);
        game.start_countdown();
        assert_eq!(game.status, Status::Countdown);
        assert_eq!(game.countdown_digit(), 3);

        let mut now = 0.0;
        let mut digits = vec![game.countdown_digit()];
        while game.status == Status::Countdown {
            now += TICK_RATE_MS as f64;
            game.on_tick(now);
            if game.status == Status::Countdown {
                let d = game.countdown_digit();
                if *digits.last().unwrap() != d {
                    digits.push(d);
                }
            }
        }
        assert_eq!(digits, vec![3, 2, 1]);
        assert_eq!(game.status, Status::Playing);
    }

    #[test]
    fn session_start_resets_counters_and_deals_a_task() {
        let game = playing_game();
        assert_eq!(game.score, 0);
        assert_eq!(game.hits, 0);
        assert_eq!(game.misses, 0);
        assert!(game.response_times.is_empty());
        assert!(game.session.is_some());
        assert!(game.current_task.is_some());
        assert!(game.engine.is_running());
        assert_eq!(game.settings, GameSettings::default());
        assert_eq!(game.seconds_remaining, 60.0);
    }

    #[test]
    fn go_hit_at_200ms_scores_100() {
        let mut game = playing_game();
        plant_target(&mut game, TargetKind::Go, 1000.0, 2500.0);

        game.pointer_down(400.0, 240.0, 1200.0);

        assert_eq!(game.score, 100);
        assert_eq!(game.hits, 1);
        assert_eq!(game.response_times, vec![200.0]);
    }

    #[test]
    fn no_go_click_penalizes_without_a_hit() {
        let mut game = playing_game();
        game.score = 200;
        plant_target(&mut game, TargetKind::NoGo, 1000.0, 2500.0);

        game.pointer_down(400.0, 240.0, 1200.0);

        assert_eq!(game.score, 0); // 200 - 300, floored
        assert_eq!(game.hits, 0);
        assert_eq!(game.misses, 1);
        // penalty latency, not a measured one
        assert_eq!(game.response_times, vec![PENALTY_RESPONSE_MS]);
    }

    #[test]
    fn score_never_goes_negative() {
        let mut game = playing_game();
        for _ in 0..10 {
            game.apply(Outcome::GoTimeout, 1000.0);
            game.apply(Outcome::CognitiveMiss { response_ms: 500.0 }, 1000.0);
        }
        assert_eq!(game.score, 0);
    }

    #[test]
    fn whiff_click_records_no_gameplay_event() {
        let mut game = playing_game();
        plant_target(&mut game, TargetKind::Go, 1000.0, 2500.0);

        game.pointer_down(10.0, 10.0, 1200.0);

        assert_eq!(game.score, 0);
        assert_eq!(game.hits, 0);
        assert_eq!(game.misses, 0);
        assert!(game.response_times.is_empty());
        assert_eq!(game.engine.targets.len(), 1);
    }

    #[test]
    fn cognitive_wrong_answer_regenerates_task() {
        let mut game = playing_game();
        game.score = 400;
        game.current_task = Some(CognitiveTask {
            prompt: "42".into(),
            answer: crate::cognitive::Answer::Right,
            kind: crate::cognitive::TaskKind::Parity,
            created_at_ms: 1000.0,
        });

        // "42" is even; A claims odd
        game.key_down(KeyCode::Char('a'), 1400.0);

        assert_eq!(game.cognitive_misses, 1);
        assert_eq!(game.score, 0); // 400 - 500, floored
        assert_eq!(game.response_times, vec![400.0]);
        let task = game.current_task.as_ref().unwrap();
        assert_eq!(task.created_at_ms, 1400.0);
    }

    #[test]
    fn cognitive_correct_answer_scores_200() {
        let mut game = playing_game();
        game.current_task = Some(CognitiveTask {
            prompt: "7".into(),
            answer: crate::cognitive::Answer::Left,
            kind: crate::cognitive::TaskKind::Parity,
            created_at_ms: 1000.0,
        });

        game.key_down(KeyCode::Char('a'), 1350.0);

        assert_eq!(game.cognitive_hits, 1);
        assert_eq!(game.score, 200);
        assert_eq!(game.response_times, vec![350.0]);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let mut game = playing_game();
        let task_before = game.current_task.clone();

        game.key_down(KeyCode::Char('q'), 1400.0);

        assert_eq!(game.cognitive_hits, 0);
        assert_eq!(game.cognitive_misses, 0);
        assert_eq!(game.current_task, task_before);
    }

    #[test]
    fn only_motor_outcomes_drive_pacing() {
        let mut game = playing_game();
        let spawn_before = game.settings.spawn_interval_ms;

        game.apply(Outcome::CognitiveHit { response_ms: 300.0 }, 1000.0);
        game.apply(Outcome::CognitiveMiss { response_ms: 300.0 }, 1000.0);
        assert_eq!(game.settings.spawn_interval_ms, spawn_before);

        game.apply(Outcome::Hit { response_ms: 300.0 }, 1000.0);
        assert!(game.settings.spawn_interval_ms < spawn_before);
    }

    #[test]
    fn five_hits_decay_pacing_exponentially() {
        let mut game = playing_game();
        for _ in 0..5 {
            game.apply(Outcome::Hit { response_ms: 250.0 }, 1000.0);
        }
        assert!((game.settings.spawn_interval_ms - 904.9).abs() < 0.1);
        assert!((game.settings.target_lifespan_ms - 1357.4).abs() < 0.1);
    }

    #[test]
    fn pacing_respects_floors_in_play() {
        let mut game = playing_game();
        for _ in 0..500 {
            game.apply(Outcome::Hit { response_ms: 250.0 }, 1000.0);
        }
        assert_eq!(game.settings.spawn_interval_ms, MIN_SPAWN_INTERVAL_MS);
        assert_eq!(game.settings.target_lifespan_ms, MIN_TARGET_LIFESPAN_MS);
    }

    #[test]
    fn timer_expiry_finalizes_once() {
        let mut game = playing_game();
        game.apply(Outcome::Hit { response_ms: 300.0 }, 1000.0);
        // keep the board quiet while the clock runs out
        game.settings.spawn_interval_ms = f64::INFINITY;

        let mut now = 4000.0;
        let mut finalized = Vec::new();
        for _ in 0..(60_000 / TICK_RATE_MS + 10) {
            now += TICK_RATE_MS as f64;
            if let Some(s) = game.on_tick(now) {
                finalized.push(s);
            }
        }
        assert_eq!(game.status, Status::Result);
        assert_eq!(finalized.len(), 1);
        let s = &finalized[0];
        assert_eq!(s.score, 100);
        assert_eq!(s.hits, 1);
        assert_eq!(s.total_targets, 1);
        assert!(s.ended_at.is_some());
        assert_eq!(s.avg_response_ms, 300.0);
        assert!(game.current_task.is_none());
        assert!(!game.engine.is_running());
    }

    #[test]
    fn manual_end_is_equivalent_and_idempotent() {
        let mut game = playing_game();
        let first = game.end_session(5000.0);
        assert!(first.is_some());
        assert_eq!(game.status, Status::Result);

        let second = game.end_session(5000.0);
        assert!(second.is_none());
        assert_eq!(game.history.len(), 1);
    }

    #[test]
    fn empty_sample_pool_yields_penalty_average() {
        let mut game = playing_game();
        let session = game.end_session(5000.0).unwrap();
        assert_eq!(session.avg_response_ms, PENALTY_RESPONSE_MS);
        assert_eq!(session.total_targets, 0);
    }

    #[test]
    fn average_pools_motor_and_cognitive_samples() {
        let mut game = playing_game();
        game.apply(Outcome::Hit { response_ms: 200.0 }, 1000.0);
        game.apply(Outcome::CognitiveHit { response_ms: 600.0 }, 2000.0);
        let session = game.end_session(5000.0).unwrap();
        assert_eq!(session.avg_response_ms, 400.0);
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let mut game = Game::new(GameSettings::default());
        let mut now = 0.0;
        let mut last_id = String::new();
        for _ in 0..55 {
            game.start_countdown();
            while game.status == Status::Countdown {
                now += TICK_RATE_MS as f64;
                game.on_tick(now);
            }
            let s = game.end_session(now).unwrap();
            last_id = s.id.clone();
        }
        assert_eq!(game.history.len(), HISTORY_CAP);
        assert_eq!(game.history[0].id, last_id);
    }

    #[test]
    fn inputs_outside_playing_are_ignored() {
        let mut game = Game::new(GameSettings::default());
        game.pointer_down(400.0, 240.0, 100.0);
        game.key_down(KeyCode::Char('a'), 100.0);
        assert_eq!(game.score, 0);
        assert_eq!(game.status, Status::Idle);

        let mut game = playing_game();
        game.end_session(1000.0);
        game.pointer_down(400.0, 240.0, 1100.0);
        assert_eq!(game.misses, 0);
    }

    #[test]
    fn reset_returns_to_idle_keeping_history() {
        let mut game = playing_game();
        game.apply(Outcome::Hit { response_ms: 300.0 }, 1000.0);
        game.end_session(2000.0);
        game.reset();

        assert_eq!(game.status, Status::Idle);
        assert_eq!(game.score, 0);
        assert!(game.session.is_none());
        assert!(game.current_task.is_none());
        assert_eq!(game.history.len(), 1);
        assert_eq!(game.settings, GameSettings::default());
    }

    #[test]
    fn retry_from_result_reenters_countdown() {
        let mut game = playing_game();
        game.end_session(2000.0);
        assert_eq!(game.status, Status::Result);

        game.start_countdown();
        assert_eq!(game.status, Status::Countdown);
        assert!(game.current_task.is_none());
    }

    #[test]
    fn go_timeout_during_ticks_records_miss_and_penalty_sample() {
        let mut game = playing_game();
        game.score = 500;
        plant_target(&mut game, TargetKind::Go, 1000.0, 1200.0);

        game.on_tick(1300.0);

        assert_eq!(game.misses, 1);
        assert_eq!(game.score, 200);
        assert_eq!(game.response_times, vec![PENALTY_RESPONSE_MS]);
        assert!(game.engine.targets.is_empty());
    }

    #[test]
    fn rt_coords_reduce_to_per_second_means() {
        let samples = vec![(0.5, 200.0), (0.9, 400.0), (2.5, 600.0)];
        let coords = reduce_rt_coords(&samples);
        assert_eq!(coords, vec![(1.0, 300.0), (3.0, 600.0)]);
    }

    #[test]
    fn best_score_over_history() {
        let mut game = playing_game();
        game.apply(Outcome::Hit { response_ms: 300.0 }, 1000.0);
        game.end_session(2000.0);
        assert_eq!(game.best_score(), 100);

        let fresh = Game::new(GameSettings::default());
        assert_eq!(fresh.best_score(), 0);
    }
}
