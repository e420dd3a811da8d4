//! Shared vocabulary for the work tracker.
//!
//! - **Ids**: [`ids::TaskId`], [`ids::SessionId`] as branded newtypes
//! - **Records**: [`task::TaskRecord`] and the draft it is built from
//! - **Catalog**: [`catalog::SubCategoryCatalog`], the category → sub-category map
//! - **UI state machines**: [`form::AddTaskForm`], [`completion::CompletionFlow`],
//!   [`session::UiSession`] and the pure [`view::render`] function

pub mod catalog;
pub mod completion;
pub mod errors;
pub mod form;
pub mod ids;
pub mod session;
pub mod task;
pub mod view;

pub use catalog::{CatalogPreset, SubCategoryCatalog, SubCategoryOption};
pub use errors::{CatalogError, TaskError};
pub use ids::{SessionId, TaskId};
pub use session::{Effect, Outcome, UiEvent, UiSession};
pub use task::{Category, TaskCounts, TaskDraft, TaskRecord, TaskStatus};
pub use view::{render, FormView, TaskSnapshot};
