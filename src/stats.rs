use crate::app_dirs::AppDirs;
use crate::game::Session;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// One row on the local leaderboard.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub nickname: String,
    pub score: u32,
    pub avg_response_ms: f64,
    pub accuracy: u32,
    pub submitted_at: DateTime<Local>,
}

/// Caller-owned score sink: submission reports structured success or
/// failure, never panics into the session flow.
pub trait Leaderboard {
    fn submit(&self, entry: &LeaderboardEntry) -> Result<()>;
    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;
}

/// Database manager for session history and the local leaderboard
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Initialize the database connection and create tables if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("blik_stats.db"));
        Self::open(&db_path)
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Result<Self> {
        Self::open(p.as_ref())
    }

    fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                score INTEGER NOT NULL,
                total_targets INTEGER NOT NULL,
                hits INTEGER NOT NULL,
                misses INTEGER NOT NULL,
                cognitive_hits INTEGER NOT NULL,
                cognitive_misses INTEGER NOT NULL,
                avg_response_ms REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS leaderboard (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nickname TEXT NOT NULL,
                score INTEGER NOT NULL,
                avg_response_ms REAL NOT NULL,
                accuracy INTEGER NOT NULL,
                submitted_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_leaderboard_score ON leaderboard(score)",
            [],
        )?;

        Ok(StatsDb { conn })
    }

    /// Record one finalized session
    pub fn record_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions
            (id, started_at, ended_at, score, total_targets, hits, misses,
             cognitive_hits, cognitive_misses, avg_response_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                session.id,
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
                session.score,
                session.total_targets,
                session.hits,
                session.misses,
                session.cognitive_hits,
                session.cognitive_misses,
                session.avg_response_ms,
            ],
        )?;

        Ok(())
    }

    /// Most recent sessions, newest first (insertion order)
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, started_at, ended_at, score, total_targets, hits, misses,
                   cognitive_hits, cognitive_misses, avg_response_ms
            FROM sessions
            ORDER BY rowid DESC
            LIMIT ?1
            "#,
        )?;

        let session_iter = stmt.query_map([limit], |row| {
            let started_str: String = row.get(1)?;
            let started_at = DateTime::parse_from_rfc3339(&started_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        1,
                        "started_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            let ended_at = row
                .get::<_, Option<String>>(2)?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|t| t.with_timezone(&Local));

            Ok(Session {
                id: row.get(0)?,
                started_at,
                ended_at,
                score: row.get(3)?,
                total_targets: row.get(4)?,
                hits: row.get(5)?,
                misses: row.get(6)?,
                cognitive_hits: row.get(7)?,
                cognitive_misses: row.get(8)?,
                avg_response_ms: row.get(9)?,
            })
        })?;

        let mut sessions = Vec::new();
        for session in session_iter {
            sessions.push(session?);
        }

        Ok(sessions)
    }

    /// Drop everything but the newest `keep` sessions
    pub fn prune_history(&self, keep: usize) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE rowid NOT IN (SELECT rowid FROM sessions ORDER BY rowid DESC LIMIT ?1)",
            [keep],
        )?;
        Ok(())
    }

    pub fn best_score(&self) -> Result<u32> {
        let best: Option<u32> = self
            .conn
            .query_row("SELECT MAX(score) FROM sessions", [], |row| row.get(0))?;
        Ok(best.unwrap_or(0))
    }

    pub fn clear_history(&self) -> Result<()> {
        self.conn.execute("DELETE FROM sessions", [])?;
        Ok(())
    }
}

impl Leaderboard for StatsDb {
    fn submit(&self, entry: &LeaderboardEntry) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO leaderboard (nickname, score, avg_response_ms, accuracy, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                entry.nickname,
                entry.score,
                entry.avg_response_ms,
                entry.accuracy,
                entry.submitted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT nickname, score, avg_response_ms, accuracy, submitted_at
            FROM leaderboard
            ORDER BY score DESC, rowid ASC
            LIMIT ?1
            "#,
        )?;

        let entry_iter = stmt.query_map([limit], |row| {
            let submitted_str: String = row.get(4)?;
            let submitted_at = DateTime::parse_from_rfc3339(&submitted_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "submitted_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(LeaderboardEntry {
                nickname: row.get(0)?,
                score: row.get(1)?,
                avg_response_ms: row.get(2)?,
                accuracy: row.get(3)?,
                submitted_at,
            })
        })?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(entries)
    }
}

/// Append one finalized session to the CSV result log
pub fn append_result_log(session: &Session) -> io::Result<()> {
    let Some(log_path) = AppDirs::result_log_path() else {
        return Ok(());
    };
    append_result_log_at(&log_path, session)
}

pub fn append_result_log_at(log_path: &Path, session: &Session) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // If the log doesn't exist yet, we need to emit a header
    let needs_header = !log_path.exists();

    let file = OpenOptions::new().append(true).create(true).open(log_path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        writer
            .write_record([
                "date",
                "score",
                "targets",
                "hits",
                "misses",
                "cognitive_hits",
                "cognitive_misses",
                "avg_response_ms",
            ])
            .map_err(io::Error::other)?;
    }

    writer
        .write_record([
            session.started_at.format("%c").to_string(),
            session.score.to_string(),
            session.total_targets.to_string(),
            session.hits.to_string(),
            session.misses.to_string(),
            session.cognitive_hits.to_string(),
            session.cognitive_misses.to_string(),
            format!("{:.2}", session.avg_response_ms),
        ])
        .map_err(io::Error::other)?;

    writer.flush()
}
