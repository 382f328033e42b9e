pub mod app_dirs;
pub mod cognitive;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod game;
pub mod runtime;
pub mod stats;
pub mod ui;
pub mod util;

use crate::config::{Config, ConfigStore, FileConfigStore, GameSettings};
use crate::game::{Game, Session, Status, HISTORY_CAP, TICK_RATE_MS};
use crate::runtime::{CrosstermEventSource, FixedTicker, GameEvent, GameEventSource, Runner, Ticker};
use crate::stats::{append_result_log, Leaderboard, LeaderboardEntry, StatsDb};
use crate::ui::Viewport;
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::{Duration, Instant},
};
use webbrowser::Browser;

/// dual-task reaction training tui
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A reaction training TUI that pairs go/no-go mouse targets with a concurrent keyboard parity task, adapts its pacing to your performance, and tracks your sessions over time."
)]
pub struct Cli {
    /// session length in seconds
    #[clap(short = 's', long)]
    duration_secs: Option<u64>,

    /// smallest target radius in board units
    #[clap(long)]
    min_radius: Option<f64>,

    /// largest target radius in board units
    #[clap(long)]
    max_radius: Option<f64>,

    /// initial milliseconds between target spawns
    #[clap(long)]
    spawn_ms: Option<f64>,

    /// initial milliseconds a target stays on the board
    #[clap(long)]
    lifespan_ms: Option<f64>,

    /// pacing preset layered on top of the configured baseline
    #[clap(short = 'p', long, value_enum, default_value_t = Preset::Standard)]
    preset: Preset,

    /// display name used for leaderboard submissions
    #[clap(short = 'n', long)]
    name: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum, strum_macros::Display)]
pub enum Preset {
    Casual,
    Standard,
    Intense,
}

impl Preset {
    fn multiplier(&self) -> f64 {
        match self {
            Preset::Casual => 0.8,
            Preset::Standard => 1.0,
            Preset::Intense => 1.25,
        }
    }
}

impl Cli {
    /// Fold CLI overrides into the stored config. Returns true when
    /// anything changed, so the caller knows to persist it.
    fn apply(&self, cfg: &mut Config) -> bool {
        let before = cfg.clone();
        if let Some(secs) = self.duration_secs {
            cfg.duration_secs = secs;
        }
        if let Some(r) = self.min_radius {
            cfg.target_min_radius = r;
        }
        if let Some(r) = self.max_radius {
            cfg.target_max_radius = r;
        }
        if let Some(ms) = self.spawn_ms {
            cfg.spawn_interval_ms = ms;
        }
        if let Some(ms) = self.lifespan_ms {
            cfg.target_lifespan_ms = ms;
        }
        if let Some(name) = &self.name {
            cfg.nickname = Some(name.clone());
        }
        *cfg != before
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitState {
    NotSubmitted,
    Submitted,
    Failed(String),
}

#[derive(Debug)]
pub struct App {
    pub cli: Option<Cli>,
    pub game: Game,
    pub viewport: Viewport,
    pub nickname: Option<String>,
    pub submit_state: SubmitState,
    pub leaderboard_rows: Vec<LeaderboardEntry>,
    pub best_score_on_disk: u32,
    pub stats_db: Option<StatsDb>,
    epoch: Instant,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let store = FileConfigStore::new();
        let mut cfg = store.load();
        if cli.apply(&mut cfg) {
            let _ = store.save(&cfg);
        }

        let mut settings = GameSettings::from(&cfg);
        settings.difficulty_multiplier = cli.preset.multiplier();

        let stats_db = StatsDb::new().ok();
        let mut game = Game::new(settings);
        if let Some(db) = &stats_db {
            if let Ok(history) = db.recent_sessions(HISTORY_CAP) {
                game.history = history;
            }
        }
        let leaderboard_rows = stats_db
            .as_ref()
            .and_then(|db| db.top(10).ok())
            .unwrap_or_default();
        let best_score_on_disk = stats_db
            .as_ref()
            .and_then(|db| db.best_score().ok())
            .unwrap_or(0);

        Self {
            nickname: cfg.nickname.clone(),
            cli: Some(cli),
            game,
            viewport: Viewport::new(80, 24),
            submit_state: SubmitState::NotSubmitted,
            leaderboard_rows,
            best_score_on_disk,
            stats_db,
            epoch: Instant::now(),
        }
    }

    /// Monotonic milliseconds since app start; the timebase every engine
    /// call sees.
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Session sink: persist one finalized record, best effort.
    fn record_session(&mut self, session: &Session) {
        if let Some(db) = &self.stats_db {
            let _ = db.record_session(session);
            let _ = db.prune_history(HISTORY_CAP);
            if let Ok(best) = db.best_score() {
                self.best_score_on_disk = best;
            }
        }
        let _ = append_result_log(session);
        self.submit_state = SubmitState::NotSubmitted;
    }

    /// Leaderboard sink: structured success/failure, surfaced on the
    /// result screen rather than thrown.
    fn submit_score(&mut self) {
        if self.submit_state == SubmitState::Submitted {
            return;
        }
        let Some(session) = self.game.session.clone() else {
            return;
        };
        let Some(db) = &self.stats_db else {
            self.submit_state = SubmitState::Failed("no local database".into());
            return;
        };

        let entry = LeaderboardEntry {
            nickname: self
                .nickname
                .clone()
                .unwrap_or_else(|| String::from("anonymous")),
            score: session.score,
            avg_response_ms: session.avg_response_ms,
            accuracy: session.accuracy(),
            submitted_at: Local::now(),
        };
        match db.submit(&entry) {
            Ok(()) => {
                self.submit_state = SubmitState::Submitted;
                self.leaderboard_rows = db.top(10).unwrap_or_default();
            }
            Err(e) => self.submit_state = SubmitState::Failed(e.to_string()),
        }
    }

    fn clear_history(&mut self) {
        if let Some(db) = &self.stats_db {
            let _ = db.clear_history();
        }
        self.game.history.clear();
        self.best_score_on_disk = 0;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    let size = terminal.size()?;
    app.viewport.resize(size.width, size.height);

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let res = run_app(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend, E: GameEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match runner.step() {
            GameEvent::Tick => {
                let now = app.now_ms();
                if let Some(session) = app.game.on_tick(now) {
                    app.record_session(&session);
                }
                // Redraw on every tick while anything animates
                if matches!(app.game.status, Status::Countdown | Status::Playing) {
                    terminal.draw(|f| ui::draw(app, f))?;
                }
            }
            GameEvent::Resize(w, h) => {
                app.viewport.resize(w, h);
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Pointer { column, row } => {
                let (x, y) = app.viewport.to_board(column, row);
                let now = app.now_ms();
                app.game.pointer_down(x, y, now);
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
        }
    }

    Ok(())
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match app.game.status {
        Status::Idle => match key.code {
            KeyCode::Esc => return true,
            KeyCode::Enter | KeyCode::Char(' ') => {
                app.submit_state = SubmitState::NotSubmitted;
                app.game.start_countdown();
            }
            KeyCode::Char('c') => app.clear_history(),
            _ => {}
        },
        Status::Countdown => {
            if key.code == KeyCode::Esc {
                app.game.reset();
            }
        }
        Status::Playing => match key.code {
            KeyCode::Esc => {
                let now = app.now_ms();
                if let Some(session) = app.game.end_session(now) {
                    app.record_session(&session);
                }
            }
            code => {
                let now = app.now_ms();
                app.game.key_down(code, now);
            }
        },
        Status::Result => match key.code {
            KeyCode::Esc => return true,
            KeyCode::Char('r') => {
                app.submit_state = SubmitState::NotSubmitted;
                app.game.start_countdown();
            }
            KeyCode::Char('m') => app.game.reset(),
            KeyCode::Char('s') => app.submit_score(),
            KeyCode::Char('t') => {
                if let Some(session) = &app.game.session {
                    if Browser::is_available() {
                        webbrowser::open(&format!(
                            "https://twitter.com/intent/tweet?text={}%20points%20%2F%20{}ms%20avg%20rt%20%2F%20{}%25%20acc%0A%0Ahttps%3A%2F%2Fgithub.com%2Fmartintrojer%2Fblik",
                            session.score,
                            session.avg_response_ms.round(),
                            session.accuracy()
                        ))
                        .unwrap_or_default();
                    }
                }
            }
            _ => {}
        },
    }

    false
}
