use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_SOURCE: &str = "/Volumes/Expansion/00_DSD/00_esoteric";
pub const DEFAULT_TARGET: &str = "/Volumes/Untitled/esoteric";

pub const SOURCE_VAR: &str = "ESOTERIC_SOURCE";
pub const TARGET_VAR: &str = "ESOTERIC_TARGET";
pub const REPORT_DIR_VAR: &str = "ESOTERIC_REPORT_DIR";

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Load `.env` from the working directory, or from `PROJECT_ROOT` when there
/// is none. Variables already set in the environment win.
pub fn load_env() {
    let local = PathBuf::from(".env");
    if local.exists() {
        dotenvy::from_path(&local).ok();
        return;
    }

    if let Ok(project_root) = std::env::var("PROJECT_ROOT") {
        let env_path = PathBuf::from(&project_root).join(".env");
        if env_path.exists() {
            dotenvy::from_path(env_path).ok();
        }
    }
}

/// Command line value, else environment variable, else built-in default.
pub fn resolve_path(flag: Option<PathBuf>, var: &str, default: &str) -> PathBuf {
    flag.or_else(|| {
        std::env::var(var)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(default))
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub source: PathBuf,
    pub target: PathBuf,
    pub dry_run: bool,
    /// Case-insensitive substring an album name must contain.
    pub album_filter: Option<String>,
    pub report_dir: PathBuf,
}

impl Config {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            dry_run: true,
            album_filter: None,
            report_dir: PathBuf::from("."),
        }
    }

    /// Both roots must exist before anything is scanned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.is_dir() {
            return Err(ConfigError::SourceMissing(self.source.clone()));
        }
        if !self.target.is_dir() {
            return Err(ConfigError::TargetMissing(self.target.clone()));
        }
        Ok(())
    }

    pub fn matches_filter(&self, album_name: &str) -> bool {
        match &self.album_filter {
            Some(filter) => album_name.to_lowercase().contains(&filter.to_lowercase()),
            None => true,
        }
    }
}

/// Create the report directory if needed.
pub fn ensure_report_dir(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| ConfigError::ReportDir(dir.to_path_buf(), e.to_string()))
}
