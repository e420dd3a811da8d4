//! Add-task form state machine.
//!
//! `Idle` until the first edit, `Editing` while fields change, `Submitted`
//! once the submit button is pressed. A successful save puts the form back
//! into `Editing` with a blank description.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{SubCategoryCatalog, SubCategoryOption};
use crate::completion::CompletionFlow;
use crate::errors::TaskError;
use crate::task::{Category, TaskDraft, TaskRecord};

pub const REMINDER_MESSAGE: &str =
    "Just write something about the task so that you can remember later!";
pub const ADDED_MESSAGE: &str = "Task added successfully";
pub const CONFIRM_COMPLETION_MESSAGE: &str = "Mark this task as complete?";
pub const FUTURE_DATE_MESSAGE: &str = "The task date cannot be in the future";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    #[default]
    Idle,
    Editing,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Info,
    ConfirmCompletion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub kind: DialogKind,
    pub message: String,
}

/// What a submit produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResult {
    /// Description was blank; the reminder is showing.
    Reminder,
    /// Another invariant failed; its message is showing.
    Rejected(TaskError),
    /// A record ready to be persisted.
    Ready(TaskRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTaskForm {
    pub phase: FormPhase,
    pub category: Category,
    pub sub_category: Option<String>,
    pub sub_category_search: String,
    pub start_date: NaiveDate,
    pub description: String,
    pub completion: CompletionFlow,
    pub notice: Option<String>,
}

impl AddTaskForm {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            phase: FormPhase::Idle,
            category: Category::default(),
            sub_category: None,
            sub_category_search: String::new(),
            start_date: today,
            description: String::new(),
            completion: CompletionFlow::default(),
            notice: None,
        }
    }

    /// The dialog currently shown, if any. The completion prompt wins over
    /// an informational notice.
    pub fn dialog(&self) -> Option<Dialog> {
        if self.completion.prompt_open() {
            return Some(Dialog {
                kind: DialogKind::ConfirmCompletion,
                message: CONFIRM_COMPLETION_MESSAGE.to_string(),
            });
        }
        self.notice.as_ref().map(|message| Dialog {
            kind: DialogKind::Info,
            message: message.clone(),
        })
    }

    fn touch(&mut self) {
        self.phase = FormPhase::Editing;
    }

    /// Switching to a different category drops the sub-category selection.
    pub fn select_category(&mut self, category: Category) -> bool {
        if self.category == category {
            return false;
        }
        self.category = category;
        self.sub_category = None;
        self.sub_category_search.clear();
        self.touch();
        true
    }

    pub fn select_sub_category(&mut self, catalog: &SubCategoryCatalog, key: &str) -> bool {
        if !catalog.contains(self.category, key) || self.sub_category.as_deref() == Some(key) {
            return false;
        }
        self.sub_category = Some(key.to_string());
        self.sub_category_search.clear();
        self.touch();
        true
    }

    pub fn search_sub_category(&mut self, text: &str) -> bool {
        if self.sub_category_search == text {
            return false;
        }
        self.sub_category_search = text.to_string();
        self.touch();
        true
    }

    /// Select the option the search text names, if there is one.
    ///
    /// Returns `Err(name)` when the text is new and must be added to the
    /// catalog first.
    pub fn resolve_search(&mut self, catalog: &SubCategoryCatalog) -> Result<bool, String> {
        let name = self.sub_category_search.trim().to_string();
        if name.is_empty() {
            return Ok(false);
        }
        match catalog.find(self.category, &name) {
            Some(option) => Ok(self.apply_added_option(&option)),
            None => Err(name),
        }
    }

    pub fn apply_added_option(&mut self, option: &SubCategoryOption) -> bool {
        self.sub_category = Some(option.key.clone());
        self.sub_category_search.clear();
        self.touch();
        true
    }

    /// Future dates are refused with an info notice; the date stays put.
    pub fn change_start_date(&mut self, date: NaiveDate, today: NaiveDate) -> bool {
        if date > today {
            self.notice = Some(FUTURE_DATE_MESSAGE.to_string());
            return true;
        }
        if self.start_date == date {
            return false;
        }
        self.start_date = date;
        self.completion.follow_start_date(date);
        self.touch();
        true
    }

    pub fn change_description(&mut self, text: &str) -> bool {
        if self.description == text {
            return false;
        }
        self.description = text.to_string();
        self.touch();
        true
    }

    pub fn toggle_status(&mut self, complete: bool) -> bool {
        let changed = self.completion.toggle(complete);
        if changed {
            self.touch();
        }
        changed
    }

    pub fn confirm_completion(&mut self, today: NaiveDate) -> bool {
        self.completion.confirm(self.start_date, today)
    }

    pub fn decline_completion(&mut self) -> bool {
        self.completion.decline()
    }

    pub fn change_end_date(&mut self, date: NaiveDate, today: NaiveDate) -> bool {
        match self.completion.set_end_date(date, self.start_date, today) {
            Ok(changed) => {
                if changed {
                    self.touch();
                }
                changed
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                true
            }
        }
    }

    /// Closing the dialog declines a pending completion prompt.
    pub fn dismiss_dialog(&mut self) -> bool {
        if self.completion.prompt_open() {
            return self.completion.decline();
        }
        self.notice.take().is_some()
    }

    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            category: self.category,
            sub_category: self.sub_category.clone(),
            start_date: self.start_date,
            description: self.description.clone(),
            status: self.completion.status(),
            end_date: self.completion.end_date(),
        }
    }

    /// Press the submit button.
    pub fn submit(&mut self, catalog: &SubCategoryCatalog, today: NaiveDate) -> SubmitResult {
        self.phase = FormPhase::Submitted;
        match self.draft().into_record(catalog, today) {
            Ok(record) => SubmitResult::Ready(record),
            Err(TaskError::EmptyDescription) => {
                self.notice = Some(REMINDER_MESSAGE.to_string());
                SubmitResult::Reminder
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                SubmitResult::Rejected(e)
            }
        }
    }

    /// The submitted record was stored.
    pub fn record_persisted(&mut self) {
        self.description.clear();
        self.notice = Some(ADDED_MESSAGE.to_string());
        self.phase = FormPhase::Editing;
    }

    /// The submitted record could not be stored.
    pub fn record_failed(&mut self, reason: &str) {
        self.notice = Some(format!("Could not save the task: {reason}"));
        self.phase = FormPhase::Editing;
    }
}
