use chrono::NaiveDate;

use crate::task::Category;

/// Reasons a task record cannot be built or changed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task description is empty")]
    EmptyDescription,

    #[error("start date {start} is after today ({today})")]
    StartDateInFuture { start: NaiveDate, today: NaiveDate },

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("end date {end} is after today ({today})")]
    EndDateInFuture { end: NaiveDate, today: NaiveDate },

    #[error("end date given for a task that is not complete")]
    EndDateWithoutCompletion,

    #[error("completed task has no end date")]
    MissingEndDate,

    #[error("unknown sub-category '{sub_category}' for {category}")]
    UnknownSubCategory {
        category: Category,
        sub_category: String,
    },

    #[error("task is already complete: {0}")]
    AlreadyComplete(String),
}

/// Errors raised by the sub-category catalog.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("sub-category name is empty")]
    EmptyName,

    #[error("unknown catalog preset: {0}")]
    UnknownPreset(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_dates() {
        let err = TaskError::EndBeforeStart {
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(err.to_string(), "end date 2024-01-01 is before start date 2024-01-02");
    }

    #[test]
    fn unknown_sub_category_names_category() {
        let err = TaskError::UnknownSubCategory {
            category: Category::Office,
            sub_category: "gardening".into(),
        };
        assert_eq!(err.to_string(), "unknown sub-category 'gardening' for Office");
    }
}
