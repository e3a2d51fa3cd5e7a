use std::fmt;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use crate::cli::{AddArgs, CliCommand, DeleteArgs, EditArgs, ListArgs, MoveArgs, ParseArgs};
use crate::config::AppConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::dates;
use crate::core::error::CaptureError;
use crate::core::gateway::SqliteGateway;
use crate::core::migration::LegacyImport;
use crate::core::store::TaskStore;
use crate::model::{ListView, Quadrant, Task, TaskPatch};
use crate::parser;
use crate::views::Board;

/// Run one command to completion on a current-thread runtime.
pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    if let CliCommand::Parse(args) = &command {
        return handle_parse(args, &mut writer);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(async {
        let store = open_store(config)?;
        store.init().await;
        if let Some(err) = store.error() {
            return Err(anyhow::Error::new(err).context("Failed to load tasks"));
        }
        run(&store, config, command, &mut writer).await
    })
}

/// Store backed by the SQLite file in the data dir, with the legacy import wired in.
pub fn open_store(config: &AppConfig) -> Result<TaskStore> {
    tracing::debug!(db = %config.db_path().display(), "opening task store");
    let gateway = SqliteGateway::initialize(config)?;
    let migrator = LegacyImport::from_config(gateway.clone(), config);
    Ok(TaskStore::new(Arc::new(gateway)).with_migrator(Arc::new(migrator)))
}

/// Dispatch against an initialized store.
pub async fn run<W: Write>(
    store: &TaskStore,
    config: &AppConfig,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    match command {
        CliCommand::Add(args) => handle_add(store, args, &mut writer).await,
        CliCommand::List(args) => handle_list(store, config, &args, &mut writer),
        CliCommand::Move(args) => handle_move(store, &args, &mut writer).await,
        CliCommand::Pin(args) => {
            let task = store.pin_task_to_today(&args.id).await;
            report(store, "Pinned", &args.id, task, &mut writer)
        }
        CliCommand::Unpin(args) => {
            let task = store.unpin_task_from_today(&args.id).await;
            report(store, "Unpinned", &args.id, task, &mut writer)
        }
        CliCommand::Done(args) => {
            let task = store.complete_task(&args.id).await;
            report(store, "Completed", &args.id, task, &mut writer)
        }
        CliCommand::Undo(args) => {
            let task = store.uncomplete_task(&args.id).await;
            report(store, "Reopened", &args.id, task, &mut writer)
        }
        CliCommand::Edit(args) => handle_edit(store, &args, &mut writer).await,
        CliCommand::Delete(args) => handle_delete(store, &args, &mut writer).await,
        CliCommand::Clear(args) => {
            if !args.yes {
                bail!("Refusing to delete every task without --yes");
            }
            let count = store.clear_all().await;
            ensure_saved(store)?;
            writeln!(writer, "{}", SummaryLine::deleted(count))?;
            Ok(())
        }
        CliCommand::Retry => {
            store.retry().await;
            if let Some(err) = store.error() {
                return Err(anyhow::Error::new(err).context("Retry failed"));
            }
            writeln!(writer, "Ready: {} task(s) loaded", store.tasks().len())?;
            Ok(())
        }
        CliCommand::Parse(args) => handle_parse(&args, &mut writer),
    }
}

async fn handle_add<W: Write>(store: &TaskStore, args: AddArgs, mut writer: W) -> Result<()> {
    let task = store.capture(&args.into()).await?;
    ensure_saved(store)?;
    writeln!(writer, "Created {}", TaskLine(&task))?;
    Ok(())
}

fn handle_list<W: Write>(
    store: &TaskStore,
    config: &AppConfig,
    args: &ListArgs,
    mut writer: W,
) -> Result<()> {
    let layout = args.layout.unwrap_or_else(|| config.today_layout());
    let board = store.board(layout);

    if args.json {
        let tasks = board.for_view(args.view);
        serde_json::to_writer_pretty(&mut writer, &tasks)?;
        writeln!(writer)?;
        return Ok(());
    }

    match args.view {
        ListView::Inbox => write_section(&mut writer, "Inbox", &board.inbox)?,
        ListView::Today => write_section(&mut writer, "Today", &board.today)?,
        ListView::Log => write_section(&mut writer, "Log", &board.log)?,
        ListView::Matrix => write_matrix(&mut writer, &board)?,
        ListView::All => {
            write_section(&mut writer, "Inbox", &board.inbox)?;
            write_section(&mut writer, "Today", &board.today)?;
            write_matrix(&mut writer, &board)?;
        }
    }
    Ok(())
}

fn write_matrix<W: Write>(mut writer: W, board: &Board) -> Result<()> {
    for quadrant in Quadrant::ALL {
        let heading = format!("{} ({})", quadrant.label(), quadrant);
        write_section(&mut writer, &heading, board.column(quadrant))?;
    }
    Ok(())
}

fn write_section<W: Write>(mut writer: W, heading: &str, tasks: &[Task]) -> Result<()> {
    writeln!(writer, "== {} [{}] ==", heading, tasks.len())?;
    for task in tasks {
        writeln!(writer, "  {}", TaskLine(task))?;
    }
    Ok(())
}

async fn handle_move<W: Write>(store: &TaskStore, args: &MoveArgs, writer: W) -> Result<()> {
    let task = store.place(&args.id, args.target).await;
    let verb = format!("Moved to {}:", args.target);
    report(store, &verb, &args.id, task, writer)
}

async fn handle_edit<W: Write>(store: &TaskStore, args: &EditArgs, writer: W) -> Result<()> {
    let patch = patch_from_args(args, store)?;
    if patch.is_empty() {
        bail!("Nothing to change: pass --title, --description, --due, --tag or a --clear-* flag");
    }
    let task = store.update_task(&args.id, &patch).await?;
    report(store, "Updated", &args.id, task, writer)
}

fn patch_from_args(args: &EditArgs, store: &TaskStore) -> Result<TaskPatch> {
    let due_date = if args.clear_due {
        Some(None)
    } else {
        match args.due.as_deref() {
            Some(spec) => {
                let date = dates::parse_due(spec, store.today())
                    .ok_or_else(|| CaptureError::InvalidDue(spec.trim().to_string()))?;
                Some(Some(date))
            }
            None => None,
        }
    };
    let description = if args.clear_description {
        Some(None)
    } else {
        args.description.clone().map(Some)
    };
    let tags = if args.tag.is_empty() {
        None
    } else {
        Some(parser::normalize_labels(&args.tag))
    };

    Ok(TaskPatch {
        title: args.title.clone(),
        description,
        due_date,
        tags,
        ..TaskPatch::default()
    })
}

async fn handle_delete<W: Write>(store: &TaskStore, args: &DeleteArgs, mut writer: W) -> Result<()> {
    let mut summary = DeleteSummary::default();
    for id in &args.ids {
        match store.delete_task(id).await {
            Some(_) => summary.deleted += 1,
            None => summary.missing.push(id.clone()),
        }
        ensure_saved(store)?;
    }
    summary.write_to(&mut writer)?;
    Ok(())
}

fn handle_parse<W: Write>(args: &ParseArgs, mut writer: W) -> Result<()> {
    let today = SystemClock.today();
    let parsed = parser::parse_task_text(&args.text.join(" "), today);
    if args.json {
        serde_json::to_writer_pretty(&mut writer, &parsed)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(writer, "title: {}", parsed.title)?;
    match parsed.due_date {
        Some(date) => writeln!(writer, "due:   {}", date)?,
        None => writeln!(writer, "due:   -")?,
    }
    writeln!(writer, "tags:  {}", parsed.tags.join(", "))?;
    Ok(())
}

fn report<W: Write>(
    store: &TaskStore,
    verb: &str,
    id: &str,
    task: Option<Task>,
    mut writer: W,
) -> Result<()> {
    let task = task.ok_or_else(|| anyhow!("No task with id {}", id))?;
    ensure_saved(store)?;
    writeln!(writer, "{} {}", verb, TaskLine(&task))?;
    Ok(())
}

/// A failed save has already been rolled back in memory; surface it as an error.
fn ensure_saved(store: &TaskStore) -> Result<()> {
    match store.error() {
        Some(err) => Err(anyhow::Error::new(err).context("Change was not saved")),
        None => Ok(()),
    }
}

struct TaskLine<'a>(&'a Task);

impl fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.0;
        write!(f, "{}  {}", task.id, task.title)?;
        if let Some(due) = task.due_date {
            write!(f, "  due:{}", due)?;
        }
        for tag in &task.tags {
            write!(f, " #{}", tag)?;
        }
        if task.is_pinned_to_today && !task.is_completed() {
            write!(f, "  [today]")?;
        }
        if let Some(done) = task.completed_at {
            write!(f, "  [done {}]", done.format("%Y-%m-%d %H:%M"))?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    missing: Vec<String>,
}

impl DeleteSummary {
    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => {
                write!(
                    f,
                    "Deleted {} task{}",
                    count,
                    if *count == 1 { "" } else { "s" }
                )
            }
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}
