use chrono::Utc;
use tracing::instrument;

use worktrack_core::{Category, SubCategoryOption};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// User-added sub-categories, replayed into the catalog on startup.
#[derive(Clone)]
pub struct SubCategoryRepo {
    db: Database,
}

impl SubCategoryRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Remember an option. Returns `false` when the key was already stored.
    #[instrument(skip(self), fields(category = %category, key = %option.key))]
    pub fn add(&self, category: Category, option: &SubCategoryOption) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO sub_categories (category, key, label, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    category.as_str(),
                    option.key,
                    option.label,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Every stored option, oldest first.
    pub fn list(&self) -> Result<Vec<(Category, SubCategoryOption)>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category, key, label FROM sub_categories ORDER BY created_at, rowid",
            )?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let raw: String = row_helpers::get(row, 0, "sub_categories", "category")?;
                let category = row_helpers::parse_enum(&raw, "sub_categories", "category")?;
                let key: String = row_helpers::get(row, 1, "sub_categories", "key")?;
                let label: String = row_helpers::get(row, 2, "sub_categories", "label")?;
                out.push((category, SubCategoryOption::new(key, label)));
            }
            Ok(out)
        })
    }
}
