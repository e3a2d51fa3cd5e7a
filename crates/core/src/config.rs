use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

use crate::views::TodayLayout;

static DEFAULT_DB_NAME: &str = "matrixtask.sqlite3";
static LEGACY_FILE_NAME: &str = "matrixtask-data.json";
static ENV_DATA_DIR: &str = "MTX_DATA_DIR";
static ENV_TODAY_LAYOUT: &str = "MTX_TODAY_LAYOUT";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "matrixtask", "mtx"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
    legacy_path: PathBuf,
    today_layout: TodayLayout,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let mut config = Self::from_data_dir(data_dir)?;
        if let Ok(raw) = env::var(ENV_TODAY_LAYOUT) {
            config.today_layout = raw
                .parse()
                .with_context(|| format!("Invalid {} value", ENV_TODAY_LAYOUT))?;
        }
        Ok(config)
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        let legacy_path = data_dir.join(LEGACY_FILE_NAME);
        Ok(Self {
            data_dir,
            db_path,
            legacy_path,
            today_layout: TodayLayout::default(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Location of the pre-SQLite JSON export picked up by the one-shot import.
    pub fn legacy_path(&self) -> &Path {
        &self.legacy_path
    }

    pub fn today_layout(&self) -> TodayLayout {
        self.today_layout
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".mtx"));
    }

    Ok(env::current_dir()?.join(".mtx"))
}
