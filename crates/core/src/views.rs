//! Read-only derivations over the task collection. Nothing here is stored.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use clap::ValueEnum;
use serde::Serialize;

use crate::model::{ListView, Quadrant, Task};

/// Whether tasks pinned to today leave their quadrant while pinned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum TodayLayout {
    #[default]
    Separate,
    Overlay,
}

impl fmt::Display for TodayLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodayLayout::Separate => write!(f, "separate"),
            TodayLayout::Overlay => write!(f, "overlay"),
        }
    }
}

impl FromStr for TodayLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "separate" => Ok(TodayLayout::Separate),
            "overlay" => Ok(TodayLayout::Overlay),
            other => Err(anyhow!(
                "Unknown today layout '{}': expected separate|overlay",
                other
            )),
        }
    }
}

pub fn inbox(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.quadrant.is_none() && !t.is_completed())
        .collect()
}

pub fn quadrant(tasks: &[Task], quadrant: Quadrant, layout: TodayLayout) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.quadrant == Some(quadrant) && !t.is_completed())
        .filter(|t| layout == TodayLayout::Overlay || !t.is_pinned_to_today)
        .collect()
}

pub fn today(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| t.is_pinned_to_today && !t.is_completed())
        .collect()
}

/// Completed tasks, most recently completed first.
pub fn log(tasks: &[Task]) -> Vec<&Task> {
    let mut done: Vec<&Task> = tasks.iter().filter(|t| t.is_completed()).collect();
    done.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    done
}

#[derive(Debug, Clone, Serialize)]
pub struct QuadrantColumn {
    pub quadrant: Quadrant,
    pub tasks: Vec<Task>,
}

/// Every view at once, as a consumer would render a full screen.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub inbox: Vec<Task>,
    pub matrix: Vec<QuadrantColumn>,
    pub today: Vec<Task>,
    pub log: Vec<Task>,
}

impl Board {
    pub fn build(tasks: &[Task], layout: TodayLayout) -> Self {
        let owned = |list: Vec<&Task>| list.into_iter().cloned().collect::<Vec<_>>();
        Self {
            inbox: owned(inbox(tasks)),
            matrix: Quadrant::ALL
                .into_iter()
                .map(|q| QuadrantColumn {
                    quadrant: q,
                    tasks: owned(quadrant(tasks, q, layout)),
                })
                .collect(),
            today: owned(today(tasks)),
            log: owned(log(tasks)),
        }
    }

    pub fn column(&self, quadrant: Quadrant) -> &[Task] {
        &self.matrix[quadrant.index()].tasks
    }

    /// Flatten the board into the list a single view shows.
    pub fn for_view(&self, view: ListView) -> Vec<&Task> {
        match view {
            ListView::Inbox => self.inbox.iter().collect(),
            ListView::Matrix => self.matrix.iter().flat_map(|c| c.tasks.iter()).collect(),
            ListView::Today => self.today.iter().collect(),
            ListView::Log => self.log.iter().collect(),
            ListView::All => self
                .inbox
                .iter()
                .chain(self.today.iter())
                .chain(self.matrix.iter().flat_map(|c| c.tasks.iter()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use crate::operations;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn fixture() -> Vec<Task> {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 11, 8, 0, 0).unwrap();
        let make = |title: &str| operations::create_task(NewTask::titled(title), t0).unwrap();

        let inbox = make("inbox");
        let q1 = operations::move_task_to_quadrant(&make("q1"), Quadrant::ImportantUrgent, t0);
        let pinned_q1 = operations::pin_task_to_today(
            &operations::move_task_to_quadrant(&make("pinned"), Quadrant::ImportantUrgent, t0),
            t0,
        );
        let done_early = operations::complete_task(&make("done early"), t0 + Duration::hours(1));
        let done_late = operations::complete_task(
            &operations::move_task_to_quadrant(&make("done late"), Quadrant::ImportantUrgent, t0),
            t0 + Duration::hours(2),
        );
        vec![inbox, q1, pinned_q1, done_early, done_late]
    }

    fn titles(list: Vec<&Task>) -> Vec<&str> {
        list.into_iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn inbox_excludes_sorted_and_completed() {
        let tasks = fixture();
        assert_eq!(titles(inbox(&tasks)), vec!["inbox"]);
    }

    #[test]
    fn quadrant_respects_today_layout() {
        let tasks = fixture();
        assert_eq!(
            titles(quadrant(&tasks, Quadrant::ImportantUrgent, TodayLayout::Separate)),
            vec!["q1"]
        );
        assert_eq!(
            titles(quadrant(&tasks, Quadrant::ImportantUrgent, TodayLayout::Overlay)),
            vec!["q1", "pinned"]
        );
        assert!(quadrant(&tasks, Quadrant::NotImportantUrgent, TodayLayout::Overlay).is_empty());
    }

    #[test]
    fn today_and_log() {
        let tasks = fixture();
        assert_eq!(titles(today(&tasks)), vec!["pinned"]);
        assert_eq!(titles(log(&tasks)), vec!["done late", "done early"]);
    }

    #[test]
    fn board_views_line_up() {
        let tasks = fixture();
        let board = Board::build(&tasks, TodayLayout::Separate);
        assert_eq!(board.column(Quadrant::ImportantUrgent).len(), 1);
        assert_eq!(titles(board.for_view(ListView::Today)), vec!["pinned"]);
        assert_eq!(
            titles(board.for_view(ListView::All)),
            vec!["inbox", "pinned", "q1"]
        );
        assert_eq!(board.for_view(ListView::Log).len(), 2);
    }

    #[test]
    fn layout_parses() {
        assert_eq!("overlay".parse::<TodayLayout>().unwrap(), TodayLayout::Overlay);
        assert!("grid".parse::<TodayLayout>().is_err());
    }
}
