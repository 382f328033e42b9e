use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use blik::cognitive::Answer;
use blik::config::GameSettings;
use blik::engine::{Target, TargetKind};
use blik::game::{Game, Status, TICK_RATE_MS};
use blik::runtime::{FixedTicker, GameEvent, Runner, TestEventSource};

fn plant_go_target(game: &mut Game, created_ms: f64) {
    game.engine.targets.push(Target {
        id: 4242,
        x: 400.0,
        y: 240.0,
        radius: 30.0,
        created_at_ms: created_ms,
        expires_at_ms: created_ms + 1500.0,
        kind: TargetKind::Go,
    });
}

// Headless integration using the internal runtime + Game without a TTY.
// Verifies that a full countdown -> playing -> result flow completes via
// Runner/TestEventSource.
#[test]
fn headless_session_flow_completes() {
    let mut game = Game::new(GameSettings::default());

    let (tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let ticker = FixedTicker::new(Duration::from_millis(1));
    let runner = Runner::new(es, ticker);

    game.start_countdown();
    assert_eq!(game.status, Status::Countdown);

    // A parity key during the countdown must be ignored
    tx.send(GameEvent::Key(KeyEvent::new(
        KeyCode::Char('a'),
        KeyModifiers::NONE,
    )))
    .unwrap();

    // Act: drive the loop until the session starts (bounded steps)
    let mut now = 0.0;
    for _ in 0..1000u32 {
        match runner.step() {
            GameEvent::Tick => {
                now += TICK_RATE_MS as f64;
                game.on_tick(now);
            }
            GameEvent::Key(key) => game.key_down(key.code, now),
            GameEvent::Pointer { .. } | GameEvent::Resize(..) => {}
        }
        if game.status == Status::Playing {
            break;
        }
    }
    assert_eq!(game.status, Status::Playing);
    assert_eq!(game.cognitive_hits + game.cognitive_misses, 0);

    // One deterministic motor hit
    plant_go_target(&mut game, now);
    game.pointer_down(400.0, 240.0, now + 250.0);
    assert_eq!(game.hits, 1);
    assert_eq!(game.score, 100);

    // Answer the active parity task correctly through the event loop
    let answer_key = match game.current_task.as_ref().unwrap().answer {
        Answer::Left => 'a',
        Answer::Right => 'd',
    };
    tx.send(GameEvent::Key(KeyEvent::new(
        KeyCode::Char(answer_key),
        KeyModifiers::NONE,
    )))
    .unwrap();
    loop {
        match runner.step() {
            GameEvent::Key(key) => {
                game.key_down(key.code, now + 400.0);
                break;
            }
            GameEvent::Tick => {}
            _ => {}
        }
    }
    assert_eq!(game.cognitive_hits, 1);
    assert_eq!(game.score, 300);
    // a fresh task was dealt immediately
    assert!(game.current_task.is_some());

    // Finish and check the record
    let session = game.end_session(now + 500.0).expect("session finalizes");
    assert_eq!(game.status, Status::Result);
    assert_eq!(session.score, 300);
    assert_eq!(session.hits, 1);
    assert_eq!(session.total_targets, 1);
    assert_eq!(session.cognitive_hits, 1);
    // pool averages the 250ms hit and the measured cognitive answer
    assert!(session.avg_response_ms > 0.0);
    assert_eq!(game.history.len(), 1);
}

#[test]
fn headless_timed_session_finishes_by_timeout() {
    // Short clock: tick until the duration elapses
    let settings = GameSettings {
        duration_secs: 0.5,
        // keep the board quiet so the result is deterministic
        spawn_interval_ms: f64::INFINITY,
        ..GameSettings::default()
    };
    let mut game = Game::new(settings);
    game.start_countdown();

    let (_tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(1)));

    let mut now = 0.0;
    let mut finalized = None;
    for _ in 0..1000u32 {
        if let GameEvent::Tick = runner.step() {
            now += TICK_RATE_MS as f64;
            if let Some(s) = game.on_tick(now) {
                finalized = Some(s);
            }
        }
        if game.status == Status::Result {
            break;
        }
    }

    assert_eq!(game.status, Status::Result, "session should finish by timeout");
    let session = finalized.expect("finalized exactly once");
    // empty sample pool reads as the fixed penalty average
    assert_eq!(session.avg_response_ms, blik::game::PENALTY_RESPONSE_MS);
    assert!(!game.engine.is_running());
    assert!(game.current_task.is_none());
}

#[test]
fn headless_retry_supersedes_previous_session() {
    let mut game = Game::new(GameSettings::default());

    game.start_countdown();
    let mut now = 0.0;
    while game.status == Status::Countdown {
        now += TICK_RATE_MS as f64;
        game.on_tick(now);
    }
    plant_go_target(&mut game, now);
    game.pointer_down(400.0, 240.0, now + 100.0);
    game.end_session(now + 200.0);
    assert_eq!(game.history.len(), 1);

    // Retry: countdown again, old board state must not leak through
    game.start_countdown();
    assert!(!game.engine.is_running());
    while game.status == Status::Countdown {
        now += TICK_RATE_MS as f64;
        game.on_tick(now);
    }
    assert_eq!(game.status, Status::Playing);
    assert_eq!(game.score, 0);
    assert_eq!(game.hits, 0);
    assert!(game.engine.targets.is_empty());
    assert!(game.engine.is_running());
}
