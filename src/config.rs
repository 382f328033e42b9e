use crate::difficulty::{MIN_SPAWN_INTERVAL_MS, MIN_TARGET_LIFESPAN_MS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Pacing and sizing knobs for one session. Regenerated from the configured
/// baseline at session start; only the difficulty controller mutates them
/// while a session is running.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    pub duration_secs: f64,
    pub target_min_radius: f64,
    pub target_max_radius: f64,
    pub spawn_interval_ms: f64,
    pub target_lifespan_ms: f64,
    pub difficulty_multiplier: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            target_min_radius: 20.0,
            target_max_radius: 40.0,
            spawn_interval_ms: 1000.0,
            target_lifespan_ms: 1500.0,
            difficulty_multiplier: 1.0,
        }
    }
}

impl GameSettings {
    /// Baseline for a fresh session. The multiplier compresses the initial
    /// pacing (>1.0 spawns faster and expires sooner); the control-law
    /// floors still apply.
    pub fn at_session_start(&self) -> GameSettings {
        let mut settings = self.clone();
        if settings.difficulty_multiplier > 0.0 {
            settings.spawn_interval_ms = (settings.spawn_interval_ms
                / settings.difficulty_multiplier)
                .max(MIN_SPAWN_INTERVAL_MS);
            settings.target_lifespan_ms = (settings.target_lifespan_ms
                / settings.difficulty_multiplier)
                .max(MIN_TARGET_LIFESPAN_MS);
        }
        settings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub duration_secs: u64,
    pub target_min_radius: f64,
    pub target_max_radius: f64,
    pub spawn_interval_ms: f64,
    pub target_lifespan_ms: f64,
    pub nickname: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            target_min_radius: 20.0,
            target_max_radius: 40.0,
            spawn_interval_ms: 1000.0,
            target_lifespan_ms: 1500.0,
            nickname: None,
        }
    }
}

impl From<&Config> for GameSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            duration_secs: cfg.duration_secs as f64,
            target_min_radius: cfg.target_min_radius,
            target_max_radius: cfg.target_max_radius,
            spawn_interval_ms: cfg.spawn_interval_ms,
            target_lifespan_ms: cfg.target_lifespan_ms,
            difficulty_multiplier: 1.0,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: crate::app_dirs::AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
