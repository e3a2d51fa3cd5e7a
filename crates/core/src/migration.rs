//! One-shot import of the legacy JSON export into SQLite, run before the first load.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::MigrationError;
use crate::gateway::{SqliteGateway, TaskGateway};
use crate::model::{Quadrant, Task};
use crate::operations;

pub const MIGRATED_FLAG: &str = "migrated-to-sqlite";
const LEGACY_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationReport {
    AlreadyMigrated,
    NothingToImport,
    Imported { count: usize },
}

#[async_trait]
pub trait Migrator: Send + Sync {
    /// Idempotent: once it has succeeded, later calls do nothing.
    async fn migrate_if_needed(&self) -> Result<MigrationReport, MigrationError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoMigration;

#[async_trait]
impl Migrator for NoMigration {
    async fn migrate_if_needed(&self) -> Result<MigrationReport, MigrationError> {
        Ok(MigrationReport::AlreadyMigrated)
    }
}

#[derive(Debug, Deserialize)]
struct LegacyExport {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    tasks: Vec<LegacyTask>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTask {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    quadrant: Option<Quadrant>,
    #[serde(default)]
    is_pinned_to_today: bool,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl From<LegacyTask> for Task {
    fn from(legacy: LegacyTask) -> Self {
        Task {
            id: legacy.id,
            title: legacy.title.trim().to_string(),
            description: legacy.description,
            quadrant: legacy.quadrant,
            is_pinned_to_today: legacy.is_pinned_to_today,
            // The old app stored local midnight as a UTC instant.
            due_date: legacy
                .due_date
                .map(|dt| dt.with_timezone(&Local).date_naive()),
            tags: legacy.tags,
            created_at: legacy.created_at,
            updated_at: legacy.updated_at.max(legacy.created_at),
            completed_at: legacy.completed_at,
        }
    }
}

fn has_valid_title(legacy: &LegacyTask) -> bool {
    match operations::validate_title(&legacy.title) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(id = legacy.id.as_str(), error = %err, "skipping legacy task");
            false
        }
    }
}

/// Imports `matrixtask-data.json` into the SQLite store exactly once.
///
/// Guarded by the [`MIGRATED_FLAG`] row in `meta`. Existing rows win over
/// legacy rows with the same id.
pub struct LegacyImport {
    gateway: SqliteGateway,
    legacy_path: PathBuf,
}

impl LegacyImport {
    pub fn new(gateway: SqliteGateway, legacy_path: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            legacy_path: legacy_path.into(),
        }
    }

    pub fn from_config(gateway: SqliteGateway, config: &AppConfig) -> Self {
        Self::new(gateway, config.legacy_path())
    }

    pub fn legacy_path(&self) -> &Path {
        &self.legacy_path
    }

    async fn read_legacy(&self) -> Result<Option<Vec<Task>>, MigrationError> {
        let raw = match tokio::fs::read_to_string(&self.legacy_path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(MigrationError::new(
                    format!("Failed to read {}", self.legacy_path.display()),
                    err,
                ))
            }
        };

        match serde_json::from_str::<LegacyExport>(&raw) {
            Ok(export) => {
                if let Some(version) = export.version.as_deref() {
                    if version != LEGACY_VERSION {
                        tracing::warn!(
                            version,
                            expected = LEGACY_VERSION,
                            "legacy export version differs; importing anyway"
                        );
                    }
                }
                Ok(Some(
                    export
                        .tasks
                        .into_iter()
                        .filter(has_valid_title)
                        .map(Task::from)
                        .collect(),
                ))
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.legacy_path.display(),
                    error = %err,
                    "legacy export is unreadable; treating it as empty"
                );
                Ok(Some(Vec::new()))
            }
        }
    }
}

#[async_trait]
impl Migrator for LegacyImport {
    async fn migrate_if_needed(&self) -> Result<MigrationReport, MigrationError> {
        let migrated = self
            .gateway
            .meta_flag(MIGRATED_FLAG)
            .await
            .map_err(|err| MigrationError::new("Failed to read migration flag", err))?;
        if migrated {
            tracing::debug!("legacy import already done; skipping");
            return Ok(MigrationReport::AlreadyMigrated);
        }

        let legacy = self.read_legacy().await?;
        let report = match legacy {
            None => MigrationReport::NothingToImport,
            Some(tasks) if tasks.is_empty() => MigrationReport::NothingToImport,
            Some(tasks) => {
                let mut merged = self
                    .gateway
                    .load_tasks()
                    .await
                    .map_err(|err| MigrationError::new("Failed to load existing tasks", err))?;
                let mut known: HashSet<String> = merged.iter().map(|t| t.id.clone()).collect();
                // First occurrence of an id wins, including repeats inside the export.
                let incoming: Vec<Task> = tasks
                    .into_iter()
                    .filter(|t| known.insert(t.id.clone()))
                    .collect();
                let count = incoming.len();
                merged.extend(incoming);

                self.gateway
                    .save_tasks(&merged)
                    .await
                    .map_err(|err| MigrationError::new("Failed to save imported tasks", err))?;
                tokio::fs::remove_file(&self.legacy_path)
                    .await
                    .map_err(|err| {
                        MigrationError::new(
                            format!("Failed to remove {}", self.legacy_path.display()),
                            err,
                        )
                    })?;
                tracing::info!(count, "imported legacy tasks");
                MigrationReport::Imported { count }
            }
        };

        self.gateway
            .set_meta_flag(MIGRATED_FLAG, true)
            .await
            .map_err(|err| MigrationError::new("Failed to record migration flag", err))?;
        Ok(report)
    }
}
