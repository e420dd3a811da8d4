//! One page's UI state and the events that drive it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{SubCategoryCatalog, SubCategoryOption};
use crate::form::{AddTaskForm, SubmitResult};
use crate::task::{Category, TaskRecord};

/// Events sent by the page, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    CategorySelected { category: Category },
    SubCategorySelected { key: String },
    SubCategorySearchChanged { text: String },
    SubCategoryAddConfirmed,
    StartDateChanged { date: NaiveDate },
    DescriptionChanged { text: String },
    StatusToggled { complete: bool },
    CompletionConfirmed,
    CompletionDeclined,
    EndDateChanged { date: NaiveDate },
    Submitted,
    DialogDismissed,
    ListToggled,
}

/// Work the controller must do before the view can be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Persist(TaskRecord),
    AddSubCategory { category: Category, name: String },
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing changed; skip rendering.
    NoUpdate,
    Updated,
    /// State changed and a side effect is pending.
    Effect(Effect),
}

impl Outcome {
    fn from_changed(changed: bool) -> Self {
        if changed {
            Self::Updated
        } else {
            Self::NoUpdate
        }
    }

    pub fn is_update(&self) -> bool {
        !matches!(self, Self::NoUpdate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSession {
    pub form: AddTaskForm,
    pub list_visible: bool,
}

impl UiSession {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            form: AddTaskForm::new(today),
            list_visible: false,
        }
    }

    pub fn apply(&mut self, event: UiEvent, catalog: &SubCategoryCatalog, today: NaiveDate) -> Outcome {
        let form = &mut self.form;
        match event {
            UiEvent::CategorySelected { category } => {
                Outcome::from_changed(form.select_category(category))
            }
            UiEvent::SubCategorySelected { key } => {
                Outcome::from_changed(form.select_sub_category(catalog, &key))
            }
            UiEvent::SubCategorySearchChanged { text } => {
                Outcome::from_changed(form.search_sub_category(&text))
            }
            UiEvent::SubCategoryAddConfirmed => match form.resolve_search(catalog) {
                Ok(changed) => Outcome::from_changed(changed),
                Err(name) => Outcome::Effect(Effect::AddSubCategory {
                    category: form.category,
                    name,
                }),
            },
            UiEvent::StartDateChanged { date } => {
                Outcome::from_changed(form.change_start_date(date, today))
            }
            UiEvent::DescriptionChanged { text } => {
                Outcome::from_changed(form.change_description(&text))
            }
            UiEvent::StatusToggled { complete } => {
                Outcome::from_changed(form.toggle_status(complete))
            }
            UiEvent::CompletionConfirmed => Outcome::from_changed(form.confirm_completion(today)),
            UiEvent::CompletionDeclined => Outcome::from_changed(form.decline_completion()),
            UiEvent::EndDateChanged { date } => {
                Outcome::from_changed(form.change_end_date(date, today))
            }
            UiEvent::Submitted => match form.submit(catalog, today) {
                SubmitResult::Ready(record) => Outcome::Effect(Effect::Persist(record)),
                SubmitResult::Reminder | SubmitResult::Rejected(_) => Outcome::Updated,
            },
            UiEvent::DialogDismissed => Outcome::from_changed(form.dismiss_dialog()),
            UiEvent::ListToggled => {
                self.list_visible = !self.list_visible;
                Outcome::Updated
            }
        }
    }

    pub fn record_persisted(&mut self) {
        self.form.record_persisted();
    }

    pub fn record_failed(&mut self, reason: &str) {
        self.form.record_failed(reason);
    }

    pub fn sub_category_added(&mut self, option: &SubCategoryOption) {
        self.form.apply_added_option(option);
    }

    pub fn sub_category_failed(&mut self, reason: &str) {
        self.form.notice = Some(format!("Could not add the sub-category: {reason}"));
    }
}
