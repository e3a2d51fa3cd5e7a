use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::capture::CaptureInput;
use crate::model::{ListView, Placement, Quadrant};
use crate::views::TodayLayout;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mtx",
    version,
    about = "Sort tasks into an urgent/important matrix, pin a few for today, log the rest.",
    after_help = "Examples:\n  mtx add 買い物に行く 明日 #家事\n  mtx add Write report next week --quadrant q2\n  mtx list --view matrix\n  mtx move 01HV... today\n  mtx done 01HV..."
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter written to stderr (e.g. "debug", "mtx_core=trace"); falls back to MTX_LOG
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Capture a task from free text (due phrases and #tags are picked out)
    Add(AddArgs),
    /// Print one of the derived views
    List(ListArgs),
    /// Drop a task on today, the inbox or a quadrant
    Move(MoveArgs),
    /// Pin a task to today
    Pin(IdArgs),
    /// Unpin a task from today
    Unpin(IdArgs),
    /// Mark a task as completed
    Done(IdArgs),
    /// Reopen a completed task
    Undo(IdArgs),
    /// Change fields of a task
    Edit(EditArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Delete every task
    Clear(ClearArgs),
    /// Re-run the load and report the store status
    Retry,
    /// Show what the parser extracts from text without saving anything
    Parse(ParseArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title with optional inline tokens (明日/tomorrow, 今週末/this weekend, 来週/next week, YYYY-MM-DD, #tag)
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Optional detailed notes
    #[arg(long)]
    pub description: Option<String>,

    /// Place the task straight into a quadrant instead of the inbox
    #[arg(long, value_enum)]
    pub quadrant: Option<Quadrant>,

    /// Add tags (comma-separated or repeated flag; '#' prefix optional)
    #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
    pub tag: Vec<String>,

    /// Set due date explicitly (ISO e.g. 2026-02-14, tomorrow, this weekend, next week)
    #[arg(long, value_name = "DATE")]
    pub due: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value = "all")]
    pub view: ListView,

    /// Whether pinned tasks also stay in their quadrant (overrides MTX_TODAY_LAYOUT)
    #[arg(long, value_enum)]
    pub layout: Option<TodayLayout>,

    /// Print the tasks as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// today, inbox, or a quadrant (important-urgent, q1, ...)
    #[arg(value_name = "TARGET")]
    pub target: Placement,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    /// New due date (ISO or a due phrase)
    #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
    pub due: Option<String>,

    #[arg(long)]
    pub clear_due: bool,

    /// Replace the tags (comma-separated or repeated flag)
    #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
    pub tag: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete (shown by `mtx list`)
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    /// Confirm deleting every task
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    #[arg(long)]
    pub json: bool,
}

impl From<&AddArgs> for CaptureInput {
    fn from(args: &AddArgs) -> Self {
        CaptureInput {
            text: args.text.clone(),
            description: args.description.clone(),
            quadrant: args.quadrant,
            tags: args.tag.clone(),
            due: args.due.clone(),
        }
    }
}

impl From<AddArgs> for CaptureInput {
    fn from(args: AddArgs) -> Self {
        CaptureInput {
            text: args.text,
            description: args.description,
            quadrant: args.quadrant,
            tags: args.tag,
            due: args.due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_flags_map_onto_capture_input() {
        let cli = Cli::try_parse_from([
            "mtx", "add", "Write", "report", "--quadrant", "q2", "--tag", "work,review", "--due",
            "next week",
        ])
        .expect("parse");
        let CliCommand::Add(args) = cli.command else {
            panic!("expected add");
        };
        let input = CaptureInput::from(args);
        assert_eq!(input.text, vec!["Write", "report"]);
        assert_eq!(input.quadrant, Some(Quadrant::ImportantNotUrgent));
        assert_eq!(input.tags, vec!["work", "review"]);
        assert_eq!(input.due.as_deref(), Some("next week"));
    }

    #[test]
    fn move_target_accepts_today_inbox_and_quadrants() {
        for (raw, expected) in [
            ("today", Placement::Today),
            ("inbox", Placement::Inbox),
            ("q4", Placement::Quadrant(Quadrant::NotImportantNotUrgent)),
        ] {
            let cli = Cli::try_parse_from(["mtx", "move", "abc", raw]).expect("parse");
            let CliCommand::Move(args) = cli.command else {
                panic!("expected move");
            };
            assert_eq!(args.target, expected);
        }
        assert!(Cli::try_parse_from(["mtx", "move", "abc", "someday"]).is_err());
    }

    #[test]
    fn edit_rejects_conflicting_flags() {
        assert!(Cli::try_parse_from(["mtx", "edit", "abc", "--due", "tomorrow", "--clear-due"])
            .is_err());
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from(["mtx", "list", "--log", "debug", "--data-dir", "/tmp/x"])
            .expect("parse");
        assert_eq!(cli.log_filter.as_deref(), Some("debug"));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }
}
