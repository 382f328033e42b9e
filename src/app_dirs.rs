use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("blik");
            Some(state_dir.join("stats.db"))
        } else {
            ProjectDirs::from("", "", "blik")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("stats.db"))
        }
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", "blik") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("blik_config.json")
        }
    }

    pub fn result_log_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "blik").map(|pd| pd.config_dir().join("log.csv"))
    }
}
