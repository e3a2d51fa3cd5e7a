use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use super::TaskGateway;
use crate::config::AppConfig;
use crate::error::StorageError;
use crate::model::{Quadrant, Task};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed gateway. Blocking calls run on the tokio blocking pool.
#[derive(Clone)]
pub struct SqliteGateway {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        Self::open(config.db_path())
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to configure SQLite WAL mode")?;
        Self::from_connection(conn, Some(path))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<&Path>) -> Result<Self> {
        apply_schema(&conn)?;
        tracing::debug!(path = ?path, "sqlite gateway ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn meta_flag(&self, key: &str) -> Result<bool, StorageError> {
        let key = key.to_string();
        self.with_conn("Failed to read metadata", move |conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM meta WHERE key = :key",
                    named_params![":key": key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.as_deref() == Some("true"))
        })
        .await
    }

    pub async fn set_meta_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        let key = key.to_string();
        let flag = if value { "true" } else { "false" };
        self.with_conn("Failed to write metadata", move |conn| {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (:key, :value)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                named_params![":key": key, ":value": flag],
            )?;
            Ok(())
        })
        .await
    }

    async fn with_conn<T, F>(&self, context: &'static str, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|err| StorageError::new(context, err))?
        .map_err(|err| StorageError::new(context, err))
    }
}

#[async_trait]
impl TaskGateway for SqliteGateway {
    async fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let tasks = tasks.to_vec();
        let count = tasks.len();
        self.with_conn("Failed to save tasks", move |conn| replace_all(conn, &tasks))
            .await?;
        tracing::debug!(count, "saved task collection");
        Ok(())
    }

    async fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        self.with_conn("Failed to load tasks", fetch_all).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.with_conn("Failed to clear tasks", |conn| {
            conn.execute("DELETE FROM tasks", [])?;
            Ok(())
        })
        .await
    }
}

fn replace_all(conn: &mut Connection, tasks: &[Task]) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM tasks", [])?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO tasks (
                id, position, title, description, quadrant, is_pinned_to_today,
                due_date, tags, created_at, updated_at, completed_at
            ) VALUES (
                :id, :position, :title, :description, :quadrant, :is_pinned_to_today,
                :due_date, :tags, :created_at, :updated_at, :completed_at
            )",
        )?;
        for (position, task) in tasks.iter().enumerate() {
            let tags_json = serde_json::to_string(&task.tags)?;
            stmt.execute(named_params![
                ":id": &task.id,
                ":position": position as i64,
                ":title": &task.title,
                ":description": task.description.as_deref(),
                ":quadrant": task.quadrant.map(|q| q.as_str()),
                ":is_pinned_to_today": task.is_pinned_to_today,
                ":due_date": task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
                ":tags": tags_json,
                ":created_at": format_timestamp(&task.created_at),
                ":updated_at": format_timestamp(&task.updated_at),
                ":completed_at": task.completed_at.as_ref().map(format_timestamp),
            ])
            .with_context(|| format!("Failed to write task {}", task.id))?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn fetch_all(conn: &mut Connection) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, quadrant, is_pinned_to_today, due_date, tags,
                created_at, updated_at, completed_at
         FROM tasks ORDER BY position ASC",
    )?;
    let mut rows = stmt.query([])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(map_task(row)?);
    }
    Ok(tasks)
}

fn map_task(row: &Row<'_>) -> Result<Task> {
    let quadrant = match row.get::<_, Option<String>>(3)? {
        Some(value) if !value.is_empty() => Some(value.parse::<Quadrant>()?),
        _ => None,
    };
    let due_date = match row.get::<_, Option<String>>(5)? {
        Some(value) => Some(
            NaiveDate::parse_from_str(&value, DATE_FORMAT)
                .map_err(|e| anyhow!("Failed to parse due date '{}': {}", value, e))?,
        ),
        None => None,
    };

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        quadrant,
        is_pinned_to_today: row.get(4)?,
        due_date,
        tags: parse_string_list(row.get::<_, Option<String>>(6)?),
        created_at: parse_timestamp(row.get::<_, String>(7)?)?,
        updated_at: parse_timestamp(row.get::<_, String>(8)?)?,
        completed_at: row
            .get::<_, Option<String>>(9)?
            .map(parse_timestamp)
            .transpose()?,
    })
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT);
         CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            quadrant TEXT,
            is_pinned_to_today INTEGER NOT NULL DEFAULT 0,
            due_date TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_tasks_position ON tasks(position);
         CREATE INDEX IF NOT EXISTS idx_tasks_quadrant ON tasks(quadrant);
        ",
    )
    .context("Failed to apply database schema")?;
    Ok(())
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_string_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
        .unwrap_or_default()
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Failed to parse timestamp '{}': {}", raw, e))
}
