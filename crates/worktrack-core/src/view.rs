//! Pure rendering of a session into what the page draws.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{SubCategoryCatalog, SubCategoryOption};
use crate::form::{Dialog, FormPhase};
use crate::session::UiSession;
use crate::task::{Category, TaskCounts, TaskRecord, TaskStatus};

/// Storage state read right before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub counts: TaskCounts,
    /// Most recent first.
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub phase: FormPhase,
    pub category: Category,
    pub category_options: Vec<Category>,
    pub sub_category: Option<String>,
    pub sub_category_options: Vec<SubCategoryOption>,
    pub sub_category_search: String,
    /// The search text names nothing yet and can be added.
    pub can_add_sub_category: bool,
    pub start_date: NaiveDate,
    pub start_date_max: NaiveDate,
    pub description: String,
    pub status: TaskStatus,
    pub status_toggle_checked: bool,
    pub end_date_visible: bool,
    pub end_date: Option<NaiveDate>,
    pub end_date_min: Option<NaiveDate>,
    pub end_date_max: Option<NaiveDate>,
    pub dialog: Option<Dialog>,
    pub total_count: usize,
    pub in_progress_count: usize,
    pub list_visible: bool,
    pub tasks: Vec<TaskRecord>,
}

pub fn render(
    session: &UiSession,
    catalog: &SubCategoryCatalog,
    snapshot: &TaskSnapshot,
    today: NaiveDate,
) -> FormView {
    let form = &session.form;
    let search = form.sub_category_search.trim();
    let can_add_sub_category =
        !search.is_empty() && catalog.find(form.category, search).is_none();
    let end_date_visible = form.completion.end_date_visible();

    FormView {
        phase: form.phase,
        category: form.category,
        category_options: Category::ALL.to_vec(),
        sub_category: form.sub_category.clone(),
        sub_category_options: catalog.options(form.category),
        sub_category_search: form.sub_category_search.clone(),
        can_add_sub_category,
        start_date: form.start_date,
        start_date_max: today,
        description: form.description.clone(),
        status: form.completion.status(),
        status_toggle_checked: form.completion.toggle_checked(),
        end_date_visible,
        end_date: form.completion.end_date(),
        end_date_min: end_date_visible.then_some(form.start_date),
        end_date_max: end_date_visible.then_some(today),
        dialog: form.dialog(),
        total_count: snapshot.counts.total(),
        in_progress_count: snapshot.counts.in_progress,
        list_visible: session.list_visible,
        tasks: if session.list_visible {
            snapshot.tasks.clone()
        } else {
            Vec::new()
        },
    }
}
