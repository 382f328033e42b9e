use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Painter, Shape},
        Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap,
    },
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::engine::{RippleKind, TargetKind, BOARD_HEIGHT, BOARD_WIDTH};
use crate::game::Status;
use crate::{App, SubmitState};

const HORIZONTAL_MARGIN: u16 = 5;

/// Maps terminal cell coordinates onto the logical board. The board is a
/// fixed size, so a resize only changes this mapping and never touches
/// live game state.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub cols: u16,
    pub rows: u16,
}

impl Viewport {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }

    /// Center of the given cell in board units, top-left origin.
    pub fn to_board(&self, column: u16, row: u16) -> (f64, f64) {
        let x = (column as f64 + 0.5) / self.cols.max(1) as f64 * BOARD_WIDTH;
        let y = (row as f64 + 0.5) / self.rows.max(1) as f64 * BOARD_HEIGHT;
        (x, y)
    }
}

/// Filled circle for the canvas; ratatui only ships outlines.
struct Disc {
    x: f64,
    y: f64,
    radius: f64,
    color: Color,
}

impl Shape for Disc {
    fn draw(&self, painter: &mut Painter) {
        let step = (self.radius / 20.0).clamp(0.75, 2.0);
        let mut dy = -self.radius;
        while dy <= self.radius {
            let mut dx = -self.radius;
            while dx <= self.radius {
                if dx * dx + dy * dy <= self.radius * self.radius {
                    if let Some((px, py)) = painter.get_point(self.x + dx, self.y + dy) {
                        painter.paint(px, py, self.color);
                    }
                }
                dx += step;
            }
            dy += step;
        }
    }
}

/// Partial ring: the remaining-lifetime indicator around a target.
struct RingArc {
    x: f64,
    y: f64,
    radius: f64,
    /// fraction of the full turn to draw, [0, 1]
    fraction: f64,
    color: Color,
}

impl Shape for RingArc {
    fn draw(&self, painter: &mut Painter) {
        let sweep = std::f64::consts::TAU * self.fraction.clamp(0.0, 1.0);
        let steps = (self.radius * 6.0).max(16.0) as u32;
        for i in 0..=steps {
            let theta = sweep * i as f64 / steps as f64;
            let px = self.x + self.radius * theta.cos();
            let py = self.y + self.radius * theta.sin();
            if let Some((px, py)) = painter.get_point(px, py) {
                painter.paint(px, py, self.color);
            }
        }
    }
}

pub fn draw(app: &App, f: &mut Frame) {
    match app.game.status {
        Status::Idle => render_idle(app, f),
        Status::Countdown => render_countdown(app, f),
        Status::Playing => render_playing(app, f),
        Status::Result => render_result(app, f),
    }
}

fn render_idle(app: &App, f: &mut Frame) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(2), // best score
            Constraint::Length(6), // how to play
            Constraint::Min(4),    // history + leaderboard
            Constraint::Length(1), // key hints
        ])
        .split(area);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "B L I K",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "dual-task reaction training",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let best = app.game.best_score().max(app.best_score_on_disk);
    if best > 0 {
        let badge = Paragraph::new(Span::styled(
            format!("personal best: {}", best),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        f.render_widget(badge, chunks[1]);
    }

    let how_to = Paragraph::new(vec![
        Line::from("click the blue targets as fast as you can"),
        Line::from("leave the red ones alone, clicking them costs points"),
        Line::from("the centre shows a number: odd press [a], even press [d]"),
        Line::from("pacing adapts to how well you keep up"),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("how to play"));
    f.render_widget(how_to, chunks[2]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[3]);

    let history_lines: Vec<Line> = if app.game.history.is_empty() {
        vec![Line::from(Span::styled(
            "no sessions yet",
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        ))]
    } else {
        app.game
            .history
            .iter()
            .take(columns[0].height.saturating_sub(2) as usize)
            .map(|s| {
                let ago = match s.ended_at {
                    Some(t) => {
                        let secs = (chrono::Local::now() - t).num_seconds().max(0) as u64;
                        HumanTime::from(std::time::Duration::from_secs(secs))
                            .to_text_en(Accuracy::Rough, Tense::Past)
                    }
                    None => String::from("-"),
                };
                Line::from(vec![
                    Span::styled(
                        format!("{:>5}  ", s.score),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(
                        "{}ms | {}%  ",
                        s.avg_response_ms.round(),
                        s.accuracy()
                    )),
                    Span::styled(ago, Style::default().add_modifier(Modifier::DIM)),
                ])
            })
            .collect()
    };
    let history = Paragraph::new(history_lines)
        .block(Block::default().borders(Borders::ALL).title("recent sessions"));
    f.render_widget(history, columns[0]);

    let board_lines: Vec<Line> = if app.leaderboard_rows.is_empty() {
        vec![Line::from(Span::styled(
            "no entries yet",
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        ))]
    } else {
        app.leaderboard_rows
            .iter()
            .take(columns[1].height.saturating_sub(2) as usize)
            .enumerate()
            .map(|(i, e)| {
                Line::from(vec![
                    Span::styled(
                        format!("{:>2}. ", i + 1),
                        Style::default().add_modifier(Modifier::DIM),
                    ),
                    Span::styled(
                        format!("{:<12}", e.nickname),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("{:>5}  ", e.score),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(format!("{}ms | {}%", e.avg_response_ms.round(), e.accuracy)),
                ])
            })
            .collect()
    };
    let leaderboard = Paragraph::new(board_lines)
        .block(Block::default().borders(Borders::ALL).title("leaderboard"));
    f.render_widget(leaderboard, columns[1]);

    let hints = Paragraph::new(Span::styled(
        "(enter)start (c)lear history (esc)quit",
        Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[4]);
}

fn render_countdown(app: &App, f: &mut Frame) {
    let area = f.area();
    let digit = app.game.countdown_digit();
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let widget = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{}", digit),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "get ready",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(widget, v[1]);
}

fn render_playing(app: &App, f: &mut Frame) {
    let area = f.area();
    let now_ms = app.now_ms();
    let game = &app.game;

    let canvas = Canvas::default()
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, BOARD_WIDTH])
        .y_bounds([0.0, BOARD_HEIGHT])
        .paint(|ctx| {
            for ripple in &game.engine.effects {
                let color = match ripple.kind {
                    RippleKind::GoHit => Color::Cyan,
                    RippleKind::NoGoHit => Color::Red,
                    RippleKind::Whiff => Color::DarkGray,
                };
                ctx.draw(&Circle {
                    x: ripple.x,
                    y: BOARD_HEIGHT - ripple.y,
                    radius: ripple.radius(now_ms),
                    color,
                });
            }

            for target in &game.engine.targets {
                let (fill, ring) = match target.kind {
                    TargetKind::Go => (Color::Blue, Color::White),
                    TargetKind::NoGo => (Color::Red, Color::Red),
                };
                let cy = BOARD_HEIGHT - target.y;
                ctx.draw(&Disc {
                    x: target.x,
                    y: cy,
                    radius: target.radius,
                    color: fill,
                });
                ctx.draw(&RingArc {
                    x: target.x,
                    y: cy,
                    radius: target.radius + 5.0,
                    fraction: 1.0 - target.lifetime_fraction(now_ms),
                    color: ring,
                });
            }
        });
    f.render_widget(canvas, area);

    // HUD along the top, drawn over the canvas
    let hud = Layout::default()
        .direction(Direction::Horizontal)
        .horizontal_margin(2)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height: area.height.min(2),
        });

    let score = Paragraph::new(vec![
        Line::from(Span::styled("score", Style::default().add_modifier(Modifier::DIM))),
        Line::from(Span::styled(
            format!("{}", game.score),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
    ]);
    f.render_widget(score, hud[0]);

    let secs_left = game.seconds_remaining.ceil().max(0.0) as u64;
    let time_style = if secs_left <= 10 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let time = Paragraph::new(vec![
        Line::from(Span::styled("time", Style::default().add_modifier(Modifier::DIM))),
        Line::from(Span::styled(format!("{}s", secs_left), time_style)),
    ])
    .alignment(Alignment::Center);
    f.render_widget(time, hud[1]);

    let hits = Paragraph::new(vec![
        Line::from(Span::styled("hits", Style::default().add_modifier(Modifier::DIM))),
        Line::from(Span::styled(
            format!("{}", game.hits),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Right);
    f.render_widget(hits, hud[2]);

    // Central parity prompt
    if let Some(task) = &game.current_task {
        let prompt_area = centered_rect(area, 24, 4);
        let prompt = Paragraph::new(vec![
            Line::from(Span::styled(
                task.prompt.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "[a] odd | even [d]",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(prompt, prompt_area);
    }

    // Adaptive pacing readout along the bottom
    if area.height > 3 {
        let footer = Rect {
            x: area.x,
            y: area.y + area.height - 1,
            width: area.width,
            height: 1,
        };
        let speed = Paragraph::new(Span::styled(
            format!(
                "adaptive speed: {:.1} targets/sec",
                1000.0 / game.settings.spawn_interval_ms
            ),
            Style::default().add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center);
        f.render_widget(speed, footer);
    }
}

fn render_result(app: &App, f: &mut Frame) {
    let area = f.area();
    let game = &app.game;
    let Some(session) = &game.session else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Min(5),    // response time chart
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // accuracy split
            Constraint::Length(1), // submission state
            Constraint::Length(1), // padding
            Constraint::Length(1), // key hints
        ])
        .split(area);

    let (duration, highest_rt) = compute_chart_params(&game.rt_coords, game.settings.duration_secs);
    let datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&game.rt_coords)];
    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, duration])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", duration)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("rt ms")
                .bounds([0.0, highest_rt])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", highest_rt)),
                ]),
        )
        .block(Block::default().borders(Borders::ALL).title("response time"));
    f.render_widget(chart, chunks[0]);

    let consistency = crate::util::std_dev(&game.response_times).unwrap_or(0.0);
    let stats = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("score {}", session.score),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("avg rt {}ms", session.avg_response_ms.round()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("sd {:.0}ms", consistency),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(stats, chunks[1]);

    let split = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "motor {}/{} ({}%)",
                session.hits,
                session.total_targets,
                session.accuracy()
            ),
            Style::default().fg(Color::Green),
        ),
        Span::raw("   "),
        Span::styled(
            format!(
                "cognitive {}/{} ({}%)",
                session.cognitive_hits,
                session.cognitive_hits + session.cognitive_misses,
                session.cognitive_accuracy()
            ),
            Style::default().fg(Color::Blue),
        ),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(split, chunks[2]);

    let submit_line = match &app.submit_state {
        SubmitState::NotSubmitted => Span::styled(
            "press (s) to submit this score to the local leaderboard",
            Style::default().add_modifier(Modifier::DIM),
        ),
        SubmitState::Submitted => Span::styled(
            "score submitted!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        SubmitState::Failed(err) => Span::styled(
            format!("submission failed: {}", err),
            Style::default().fg(Color::Red),
        ),
    };
    f.render_widget(
        Paragraph::new(submit_line).alignment(Alignment::Center),
        chunks[3],
    );

    let hints = Paragraph::new(Span::styled(
        "(r)etry (m)enu (s)ubmit (t)weet (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[5]);
}

/// Compute X (seconds) and Y (rt ms) bounds for the results chart
pub fn compute_chart_params(rt_coords: &[(f64, f64)], duration_secs: f64) -> (f64, f64) {
    let mut highest_rt: f64 = 0.0;
    for &(_, rt) in rt_coords {
        if rt > highest_rt {
            highest_rt = rt;
        }
    }
    if highest_rt < 1.0 {
        highest_rt = crate::game::PENALTY_RESPONSE_MS;
    }

    let duration = match rt_coords.last() {
        Some(&(t, _)) => t.max(duration_secs),
        None => duration_secs.max(1.0),
    };

    (duration, highest_rt.round())
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}
