//! Completion confirmation flow.
//!
//! ```text
//! InProgress --toggle on--> AwaitingConfirmation --confirm--> Complete
//!      ^                          |                              |
//!      +--------decline-----------+                              |
//!      +--------------------toggle off---------------------------+
//! ```
//!
//! Status only becomes complete after the user confirms; the end-date input
//! is visible only in `Complete`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::TaskError;
use crate::task::{check_end_date, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CompletionFlow {
    #[default]
    InProgress,
    AwaitingConfirmation,
    Complete { end_date: NaiveDate },
}

impl CompletionFlow {
    /// Status that would be committed if the form were submitted now.
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Complete { .. } => TaskStatus::Complete,
            _ => TaskStatus::InProgress,
        }
    }

    /// Position of the status toggle as drawn.
    pub fn toggle_checked(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    pub fn prompt_open(&self) -> bool {
        matches!(self, Self::AwaitingConfirmation)
    }

    pub fn end_date_visible(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Complete { end_date } => Some(*end_date),
            _ => None,
        }
    }

    /// Returns `true` when the state changed.
    pub fn toggle(&mut self, on: bool) -> bool {
        match (*self, on) {
            (Self::InProgress, true) => {
                *self = Self::AwaitingConfirmation;
                true
            }
            (Self::AwaitingConfirmation | Self::Complete { .. }, false) => {
                *self = Self::InProgress;
                true
            }
            _ => false,
        }
    }

    /// Commit completion. The end date starts at today, never before `start`.
    pub fn confirm(&mut self, start: NaiveDate, today: NaiveDate) -> bool {
        if !self.prompt_open() {
            return false;
        }
        *self = Self::Complete {
            end_date: today.max(start),
        };
        true
    }

    /// Revert the toggle and hide the end-date input.
    pub fn decline(&mut self) -> bool {
        if !self.prompt_open() {
            return false;
        }
        *self = Self::InProgress;
        true
    }

    /// Change the end date while complete.
    pub fn set_end_date(
        &mut self,
        end: NaiveDate,
        start: NaiveDate,
        today: NaiveDate,
    ) -> Result<bool, TaskError> {
        let Self::Complete { end_date } = self else {
            return Err(TaskError::EndDateWithoutCompletion);
        };
        check_end_date(start, end, today)?;
        if *end_date == end {
            return Ok(false);
        }
        *end_date = end;
        Ok(true)
    }

    /// Keep `end_date >= start` after the start date moved.
    pub fn follow_start_date(&mut self, start: NaiveDate) {
        if let Self::Complete { end_date } = self {
            if *end_date < start {
                *end_date = start;
            }
        }
    }
}
