//! Task records and the drafts they are built from.
//!
//! A record is stored as a flat JSON document. The wire keys follow the
//! collection layout the tracker has always used (`_id`, `task_description`,
//! `task_status` as `0`/`1`), so older documents written with `task_date`
//! still read back.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::SubCategoryCatalog;
use crate::errors::TaskError;
use crate::ids::TaskId;

/// Top-level task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Personal,
    Office,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Personal, Category::Office];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Office => "Office",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Personal" | "personal" => Ok(Self::Personal),
            "Office" | "office" => Ok(Self::Office),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Completion flag, stored as `0` (in progress) or `1` (complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaskStatus {
    #[default]
    InProgress,
    Complete,
}

impl TaskStatus {
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::InProgress => 0,
            TaskStatus::Complete => 1,
        }
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::InProgress),
            1 => Ok(Self::Complete),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "_id")]
    pub id: TaskId,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(alias = "task_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "task_description", alias = "description")]
    pub description: String,
    #[serde(rename = "task_status", default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Field values collected before a record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub category: Category,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(alias = "task_date")]
    pub start_date: NaiveDate,
    #[serde(alias = "task_description")]
    pub description: String,
    #[serde(default, alias = "task_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl TaskDraft {
    /// Check the draft against the record invariants.
    ///
    /// A complete draft without an end date is accepted; [`TaskDraft::into_record`]
    /// fills in `today`.
    pub fn validate(&self, catalog: &SubCategoryCatalog, today: NaiveDate) -> Result<(), TaskError> {
        check_fields(
            self.category,
            self.sub_category.as_deref(),
            self.start_date,
            &self.description,
            catalog,
            today,
        )?;
        match (self.status, self.end_date) {
            (TaskStatus::InProgress, Some(_)) => Err(TaskError::EndDateWithoutCompletion),
            (TaskStatus::Complete, Some(end)) => check_end_date(self.start_date, end, today),
            _ => Ok(()),
        }
    }

    /// Validate and stamp a fresh id.
    pub fn into_record(
        self,
        catalog: &SubCategoryCatalog,
        today: NaiveDate,
    ) -> Result<TaskRecord, TaskError> {
        self.validate(catalog, today)?;
        let end_date = match self.status {
            TaskStatus::Complete => Some(self.end_date.unwrap_or(today)),
            TaskStatus::InProgress => None,
        };
        Ok(TaskRecord {
            id: TaskId::new(),
            category: self.category,
            sub_category: self.sub_category,
            start_date: self.start_date,
            description: self.description,
            status: self.status,
            end_date,
        })
    }
}

fn check_fields(
    category: Category,
    sub_category: Option<&str>,
    start_date: NaiveDate,
    description: &str,
    catalog: &SubCategoryCatalog,
    today: NaiveDate,
) -> Result<(), TaskError> {
    if description.trim().is_empty() {
        return Err(TaskError::EmptyDescription);
    }
    if start_date > today {
        return Err(TaskError::StartDateInFuture {
            start: start_date,
            today,
        });
    }
    if let Some(sub) = sub_category {
        if !catalog.contains(category, sub) {
            return Err(TaskError::UnknownSubCategory {
                category,
                sub_category: sub.to_string(),
            });
        }
    }
    Ok(())
}

/// `start <= end <= today`
pub fn check_end_date(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<(), TaskError> {
    if end < start {
        return Err(TaskError::EndBeforeStart { start, end });
    }
    if end > today {
        return Err(TaskError::EndDateInFuture { end, today });
    }
    Ok(())
}

impl TaskRecord {
    /// Check a stored record against the same invariants a new draft must
    /// meet. Unlike a draft, a complete record must carry its end date.
    pub fn validate(&self, catalog: &SubCategoryCatalog, today: NaiveDate) -> Result<(), TaskError> {
        check_fields(
            self.category,
            self.sub_category.as_deref(),
            self.start_date,
            &self.description,
            catalog,
            today,
        )?;
        match (self.status, self.end_date) {
            (TaskStatus::InProgress, Some(_)) => Err(TaskError::EndDateWithoutCompletion),
            (TaskStatus::InProgress, None) => Ok(()),
            (TaskStatus::Complete, Some(end)) => check_end_date(self.start_date, end, today),
            (TaskStatus::Complete, None) => Err(TaskError::MissingEndDate),
        }
    }

    /// Mark an in-progress record complete as of `end_date`.
    pub fn complete(mut self, end_date: NaiveDate, today: NaiveDate) -> Result<Self, TaskError> {
        if self.status.is_complete() {
            return Err(TaskError::AlreadyComplete(self.id.to_string()));
        }
        check_end_date(self.start_date, end_date, today)?;
        self.status = TaskStatus::Complete;
        self.end_date = Some(end_date);
        Ok(self)
    }
}

/// Counts read back from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub in_progress: usize,
    pub completed: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.in_progress + self.completed
    }
}

/// Most recent first: start date descending, then id descending.
pub fn sort_most_recent(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|a, b| {
        b.start_date
            .cmp(&a.start_date)
            .then_with(|| b.id.cmp(&a.id))
    });
}
