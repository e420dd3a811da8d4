use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use worktrack_core::task::sort_most_recent;
use worktrack_core::{SubCategoryCatalog, TaskCounts, TaskError, TaskId, TaskRecord, TaskStatus};

use crate::database::Database;
use crate::documents::{self, DeleteAck, DocumentStore, InsertAck, UpdateAck};
use crate::error::StoreError;
use crate::filter::{Filter, Patch};

/// The two task collections. Status decides which one a record lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCollection {
    #[serde(rename = "in_progress_tasks")]
    InProgress,
    #[serde(rename = "completed_tasks")]
    Completed,
}

impl TaskCollection {
    pub const ALL: [TaskCollection; 2] = [TaskCollection::InProgress, TaskCollection::Completed];

    pub fn name(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress_tasks",
            Self::Completed => "completed_tasks",
        }
    }

    pub fn for_status(status: TaskStatus) -> Self {
        match status {
            TaskStatus::InProgress => Self::InProgress,
            TaskStatus::Complete => Self::Completed,
        }
    }
}

impl fmt::Display for TaskCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskCollection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress_tasks" => Ok(Self::InProgress),
            "completed_tasks" => Ok(Self::Completed),
            other => Err(format!("unknown task collection: {other}")),
        }
    }
}

/// Typed access to task records on top of [`DocumentStore`].
#[derive(Clone)]
pub struct TaskRepo {
    docs: DocumentStore,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self {
            docs: DocumentStore::new(db),
        }
    }

    /// Store a record in the collection matching its status.
    #[instrument(skip(self, record), fields(task_id = %record.id, status = ?record.status))]
    pub fn insert(&self, record: &TaskRecord) -> Result<InsertAck, StoreError> {
        let collection = TaskCollection::for_status(record.status);
        let doc = serde_json::to_value(record)?;
        let ack = self.docs.insert(collection.name(), &doc)?;
        info!(collection = %collection, "task stored");
        Ok(ack)
    }

    /// Every task from both collections, most recent first.
    #[instrument(skip(self))]
    pub fn list_all(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut tasks = Vec::new();
        for collection in TaskCollection::ALL {
            for record in self.docs.find::<TaskRecord>(collection.name(), Filter::all()) {
                tasks.push(record?);
            }
        }
        sort_most_recent(&mut tasks);
        Ok(tasks)
    }

    /// Fresh counts per collection.
    pub fn counts(&self) -> Result<TaskCounts, StoreError> {
        Ok(TaskCounts {
            in_progress: self.docs.count(TaskCollection::InProgress.name(), &Filter::all())?,
            completed: self.docs.count(TaskCollection::Completed.name(), &Filter::all())?,
        })
    }

    #[instrument(skip(self, filter), fields(collection = %collection))]
    pub fn delete_matching(
        &self,
        collection: TaskCollection,
        filter: &Filter,
    ) -> Result<DeleteAck, StoreError> {
        self.docs.delete_many(collection.name(), filter)
    }

    /// Partial update. Status moves between collections, so it cannot be
    /// patched here; use [`TaskRepo::complete`].
    ///
    /// Every matched record is patched, decoded and re-validated inside one
    /// transaction. A single bad result leaves the whole collection untouched.
    #[instrument(skip(self, filter, patch, catalog), fields(collection = %collection))]
    pub fn update_matching(
        &self,
        collection: TaskCollection,
        filter: &Filter,
        patch: &Patch,
        catalog: &SubCategoryCatalog,
        today: NaiveDate,
    ) -> Result<UpdateAck, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::UnboundedFilter);
        }
        if patch.touches("task_status") || patch.touches("end_date") {
            return Err(StoreError::InvalidPatch(
                "task_status and end_date change through task completion".into(),
            ));
        }
        let name = collection.name();
        let matched_count = self.docs.database().with_tx(|tx| {
            let rows = documents::select_in(tx, name, filter)?;
            for (id, body) in &rows {
                let mut doc: serde_json::Value = serde_json::from_str(body)?;
                patch.apply(&mut doc)?;
                let record: TaskRecord = serde_json::from_value(doc)
                    .map_err(|e| StoreError::InvalidPatch(format!("{id}: {e}")))?;
                record.validate(catalog, today)?;
                documents::replace_in(tx, name, id, &serde_json::to_value(&record)?)?;
            }
            Ok(rows.len())
        })?;
        info!(matched_count, "tasks updated");
        Ok(UpdateAck { matched_count })
    }

    /// Move an in-progress task to the completed collection.
    #[instrument(skip(self), fields(task_id = %id))]
    pub fn complete(
        &self,
        id: &TaskId,
        end_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<TaskRecord, StoreError> {
        let from = TaskCollection::InProgress.name();
        let to = TaskCollection::Completed.name();
        let record = self.docs.database().with_tx(|tx| {
            let Some(body) = documents::get_in(tx, from, id.as_str())? else {
                if documents::get_in(tx, to, id.as_str())?.is_some() {
                    return Err(TaskError::AlreadyComplete(id.to_string()).into());
                }
                return Err(StoreError::NotFound(format!("task {id}")));
            };
            let record: TaskRecord = serde_json::from_str(&body)?;
            let record = record.complete(end_date, today)?;
            documents::delete_in(tx, from, &Filter::by_id(id.as_str()))?;
            documents::insert_in(tx, to, &serde_json::to_value(&record)?)?;
            Ok(record)
        })?;
        info!(end_date = %end_date, "task completed");
        Ok(record)
    }
}
