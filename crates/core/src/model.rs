use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quadrant {
    ImportantUrgent,
    ImportantNotUrgent,
    NotImportantUrgent,
    NotImportantNotUrgent,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::ImportantUrgent,
        Quadrant::ImportantNotUrgent,
        Quadrant::NotImportantUrgent,
        Quadrant::NotImportantNotUrgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::ImportantUrgent => "important-urgent",
            Quadrant::ImportantNotUrgent => "important-not-urgent",
            Quadrant::NotImportantUrgent => "not-important-urgent",
            Quadrant::NotImportantNotUrgent => "not-important-not-urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::ImportantUrgent => "Do first",
            Quadrant::ImportantNotUrgent => "Schedule",
            Quadrant::NotImportantUrgent => "Delegate",
            Quadrant::NotImportantNotUrgent => "Eliminate",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Quadrant::ImportantUrgent => 0,
            Quadrant::ImportantNotUrgent => 1,
            Quadrant::NotImportantUrgent => 2,
            Quadrant::NotImportantNotUrgent => 3,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Quadrant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "important-urgent" | "q1" => Ok(Quadrant::ImportantUrgent),
            "important-not-urgent" | "q2" => Ok(Quadrant::ImportantNotUrgent),
            "not-important-urgent" | "q3" => Ok(Quadrant::NotImportantUrgent),
            "not-important-not-urgent" | "q4" => Ok(Quadrant::NotImportantNotUrgent),
            other => Err(anyhow!(
                "Unknown quadrant '{}': expected important-urgent|important-not-urgent|not-important-urgent|not-important-not-urgent (or q1-q4)",
                other
            )),
        }
    }
}

impl ValueEnum for Quadrant {
    fn value_variants<'a>() -> &'a [Self] {
        &Quadrant::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let alias = match self {
            Quadrant::ImportantUrgent => "q1",
            Quadrant::ImportantNotUrgent => "q2",
            Quadrant::NotImportantUrgent => "q3",
            Quadrant::NotImportantNotUrgent => "q4",
        };
        Some(clap::builder::PossibleValue::new(self.as_str()).alias(alias))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quadrant: Option<Quadrant>,
    pub is_pinned_to_today: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_in_inbox(&self) -> bool {
        self.quadrant.is_none()
    }
}

/// Data needed to create a task. Everything but the title is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub quadrant: Option<Quadrant>,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a task. `Some(None)` clears an optional field.
///
/// Identity, timestamps and completion are not patchable; they only move
/// through the dedicated transitions in [`crate::operations`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub quadrant: Option<Option<Quadrant>>,
    pub is_pinned_to_today: Option<bool>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Output of the free-text parser; consumed right away to build a [`NewTask`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl From<ParsedTask> for NewTask {
    fn from(parsed: ParsedTask) -> Self {
        Self {
            title: parsed.title,
            description: None,
            quadrant: None,
            due_date: parsed.due_date,
            tags: parsed.tags,
        }
    }
}

/// Drop target for a task: the today panel, the inbox or a matrix quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Today,
    Inbox,
    Quadrant(Quadrant),
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Today => write!(f, "today"),
            Placement::Inbox => write!(f, "inbox"),
            Placement::Quadrant(quadrant) => write!(f, "{}", quadrant),
        }
    }
}

impl FromStr for Placement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Placement::Today),
            "inbox" => Ok(Placement::Inbox),
            other => other
                .parse::<Quadrant>()
                .map(Placement::Quadrant)
                .map_err(|_| {
                    anyhow!(
                        "Unknown drop target '{}': expected today, inbox or a quadrant",
                        other
                    )
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum ListView {
    Inbox,
    Matrix,
    Today,
    Log,
    All,
}
