//! Collection-oriented document store on SQLite.
//!
//! Every document is a JSON object with a string `_id`, unique per
//! collection. Reads come back in insertion order.

use std::collections::VecDeque;
use std::marker::PhantomData;

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::filter::{Filter, Patch};
use crate::row_helpers;

const CURSOR_BATCH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub inserted_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub deleted_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub matched_count: usize,
}

#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert one document. No domain validation happens here.
    #[instrument(skip(self, document))]
    pub fn insert(&self, collection: &str, document: &Value) -> Result<InsertAck, StoreError> {
        self.db.with_conn(|conn| insert_in(conn, collection, document))
    }

    /// Lazily iterate documents matching `filter`.
    ///
    /// Rows are fetched in batches as the cursor advances and each item is
    /// deserialized on its own, so a bad document surfaces as one `Err` item.
    pub fn find<T: DeserializeOwned>(&self, collection: &str, filter: Filter) -> Cursor<T> {
        Cursor {
            db: self.db.clone(),
            collection: collection.to_string(),
            filter,
            after_seq: 0,
            batch: VecDeque::new(),
            done: false,
            _item: PhantomData,
        }
    }

    /// Delete every document matching a non-empty filter.
    #[instrument(skip(self, filter))]
    pub fn delete_many(&self, collection: &str, filter: &Filter) -> Result<DeleteAck, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::UnboundedFilter);
        }
        self.db.with_conn(|conn| delete_in(conn, collection, filter))
    }

    /// Set the patch fields on every document matching a non-empty filter.
    #[instrument(skip(self, filter, patch))]
    pub fn update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<UpdateAck, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::UnboundedFilter);
        }
        self.db.with_conn(|conn| {
            let (set_sql, mut params) = patch.to_sql();
            let (where_sql, where_params) = filter.to_sql();
            params.push(SqlValue::Text(collection.to_string()));
            params.extend(where_params);
            let sql = format!("UPDATE documents SET body = {set_sql} WHERE collection = ?{where_sql}");
            let matched_count = conn.execute(&sql, params_from_iter(params))?;
            debug!(collection, matched_count, "documents updated");
            Ok(UpdateAck { matched_count })
        })
    }

    /// Number of documents matching `filter`, read from storage.
    pub fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| count_in(conn, collection, filter))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

pub(crate) fn insert_in(
    conn: &Connection,
    collection: &str,
    document: &Value,
) -> Result<InsertAck, StoreError> {
    let Some(object) = document.as_object() else {
        return Err(StoreError::InvalidDocument("document must be a JSON object".into()));
    };
    let Some(id) = object.get("_id").and_then(Value::as_str) else {
        return Err(StoreError::InvalidDocument("document needs a string _id".into()));
    };
    let body = serde_json::to_string(document)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![collection, id, body, Utc::now().to_rfc3339()],
    )
    .map_err(|e| {
        if row_helpers::is_constraint_violation(&e) {
            StoreError::Conflict(format!("{collection}/{id} already exists"))
        } else {
            StoreError::from(e)
        }
    })?;
    debug!(collection, id, "document inserted");
    Ok(InsertAck {
        inserted_id: id.to_string(),
    })
}

pub(crate) fn delete_in(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
) -> Result<DeleteAck, StoreError> {
    let (where_sql, where_params) = filter.to_sql();
    let mut params = vec![SqlValue::Text(collection.to_string())];
    params.extend(where_params);
    let sql = format!("DELETE FROM documents WHERE collection = ?{where_sql}");
    let deleted_count = conn.execute(&sql, params_from_iter(params))?;
    debug!(collection, deleted_count, "documents deleted");
    Ok(DeleteAck { deleted_count })
}

pub(crate) fn count_in(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
) -> Result<usize, StoreError> {
    let (where_sql, where_params) = filter.to_sql();
    let mut params = vec![SqlValue::Text(collection.to_string())];
    params.extend(where_params);
    let sql = format!("SELECT COUNT(*) FROM documents WHERE collection = ?{where_sql}");
    let count: i64 = conn.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Read the raw body of one document.
pub(crate) fn get_in(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> Result<Option<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")?;
    let mut rows = stmt.query([collection, id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_helpers::get(row, 0, "documents", "body")?)),
        None => Ok(None),
    }
}

/// `(id, body)` of every document matching `filter`, in insertion order.
pub(crate) fn select_in(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<(String, String)>, StoreError> {
    let (where_sql, where_params) = filter.to_sql();
    let mut params = vec![SqlValue::Text(collection.to_string())];
    params.extend(where_params);
    let sql = format!("SELECT id, body FROM documents WHERE collection = ?{where_sql} ORDER BY seq");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push((
            row_helpers::get(row, 0, "documents", "id")?,
            row_helpers::get(row, 1, "documents", "body")?,
        ));
    }
    Ok(out)
}

/// Overwrite the body of one document.
pub(crate) fn replace_in(
    conn: &Connection,
    collection: &str,
    id: &str,
    document: &Value,
) -> Result<(), StoreError> {
    let body = serde_json::to_string(document)?;
    let changed = conn.execute(
        "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
        rusqlite::params![body, collection, id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("{collection}/{id}")));
    }
    Ok(())
}

/// Lazy, batched iterator over a `find` result.
pub struct Cursor<T> {
    db: Database,
    collection: String,
    filter: Filter,
    after_seq: i64,
    batch: VecDeque<String>,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T> Cursor<T> {
    fn fill(&mut self) -> Result<(), StoreError> {
        let (where_sql, where_params) = self.filter.to_sql();
        let mut params = vec![
            SqlValue::Text(self.collection.clone()),
            SqlValue::Integer(self.after_seq),
        ];
        params.extend(where_params);
        let sql = format!(
            "SELECT seq, body FROM documents WHERE collection = ? AND seq > ?{where_sql}
             ORDER BY seq LIMIT {CURSOR_BATCH}"
        );
        let rows: Vec<(i64, String)> = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        if rows.len() < CURSOR_BATCH {
            self.done = true;
        }
        if let Some((seq, _)) = rows.last() {
            self.after_seq = *seq;
        }
        self.batch.extend(rows.into_iter().map(|(_, body)| body));
        Ok(())
    }
}

impl<T: DeserializeOwned> Iterator for Cursor<T> {
    type Item = Result<T, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batch.is_empty() && !self.done {
            if let Err(e) = self.fill() {
                self.done = true;
                return Some(Err(e));
            }
        }
        let body = self.batch.pop_front()?;
        Some(serde_json::from_str(&body).map_err(StoreError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> DocumentStore {
        DocumentStore::new(Database::in_memory().unwrap())
    }

    fn filter(v: Value) -> Filter {
        Filter::from_json(&v).unwrap()
    }

    fn all(store: &DocumentStore, collection: &str) -> Vec<Value> {
        store
            .find::<Value>(collection, Filter::all())
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn insert_then_find() {
        let store = store();
        let ack = store
            .insert("notes", &json!({"_id": "a", "text": "hello"}))
            .unwrap();
        assert_eq!(ack.inserted_id, "a");
        assert_eq!(all(&store, "notes"), vec![json!({"_id": "a", "text": "hello"})]);
        assert!(all(&store, "other").is_empty());
    }

    #[test]
    fn insert_requires_object_with_string_id() {
        let store = store();
        for bad in [json!([1]), json!({"text": "x"}), json!({"_id": 5})] {
            assert!(matches!(
                store.insert("notes", &bad),
                Err(StoreError::InvalidDocument(_))
            ));
        }
    }

    #[test]
    fn duplicate_id_conflicts() {
        let store = store();
        store.insert("notes", &json!({"_id": "a"})).unwrap();
        assert!(matches!(
            store.insert("notes", &json!({"_id": "a"})),
            Err(StoreError::Conflict(_))
        ));
        // Same id in another collection is fine.
        store.insert("archive", &json!({"_id": "a"})).unwrap();
    }

    #[test]
    fn find_keeps_insertion_order_across_batches() {
        let store = store();
        let n = CURSOR_BATCH * 2 + 5;
        for i in 0..n {
            store
                .insert("notes", &json!({"_id": format!("n{i}"), "i": i, "even": i % 2 == 0}))
                .unwrap();
        }
        let docs = all(&store, "notes");
        assert_eq!(docs.len(), n);
        assert_eq!(docs[0]["i"], 0);
        assert_eq!(docs[n - 1]["i"], n - 1);

        let evens: Vec<Value> = store
            .find("notes", filter(json!({"even": true})))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(evens.len(), n / 2 + 1);
    }

    #[test]
    fn cursor_is_lazy() {
        let store = store();
        store.insert("notes", &json!({"_id": "a"})).unwrap();
        let mut cursor = store.find::<Value>("notes", Filter::all());
        // Documents added before the first read are still seen.
        store.insert("notes", &json!({"_id": "b"})).unwrap();
        assert_eq!(cursor.next().unwrap().unwrap()["_id"], "a");
        assert_eq!(cursor.next().unwrap().unwrap()["_id"], "b");
        assert!(cursor.next().is_none());
    }

    #[test]
    fn bad_document_is_one_error_item() {
        #[derive(serde::Deserialize)]
        struct Note {
            #[allow(dead_code)]
            text: String,
        }
        let store = store();
        store.insert("notes", &json!({"_id": "a", "text": "ok"})).unwrap();
        store.insert("notes", &json!({"_id": "b"})).unwrap();
        let items: Vec<Result<Note, StoreError>> = store.find("notes", Filter::all()).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(StoreError::Serialization(_))));
    }

    #[test]
    fn filter_matches_scalars() {
        let store = store();
        store.insert("t", &json!({"_id": "1", "cat": "Office", "n": 1})).unwrap();
        store.insert("t", &json!({"_id": "2", "cat": "Personal", "n": 2})).unwrap();
        store.insert("t", &json!({"_id": "3", "cat": "Office"})).unwrap();

        assert_eq!(store.count("t", &filter(json!({"cat": "Office"}))).unwrap(), 2);
        assert_eq!(store.count("t", &filter(json!({"cat": "Office", "n": 1}))).unwrap(), 1);
        assert_eq!(store.count("t", &filter(json!({"n": null}))).unwrap(), 1);
        assert_eq!(store.count("t", &filter(json!({"n": "1"}))).unwrap(), 0);
        assert_eq!(store.count("t", &Filter::all()).unwrap(), 3);
    }

    #[test]
    fn delete_many_removes_matches_only() {
        let store = store();
        store.insert("t", &json!({"_id": "1", "cat": "Office"})).unwrap();
        store.insert("t", &json!({"_id": "2", "cat": "Personal"})).unwrap();
        let ack = store.delete_many("t", &filter(json!({"cat": "Office"}))).unwrap();
        assert_eq!(ack.deleted_count, 1);
        assert_eq!(all(&store, "t").len(), 1);
    }

    #[test]
    fn delete_many_refuses_empty_filter() {
        let store = store();
        store.insert("t", &json!({"_id": "1"})).unwrap();
        assert!(matches!(
            store.delete_many("t", &Filter::all()),
            Err(StoreError::UnboundedFilter)
        ));
        assert_eq!(store.count("t", &Filter::all()).unwrap(), 1);
    }

    #[test]
    fn update_sets_fields_without_deleting() {
        let store = store();
        store
            .insert("t", &json!({"_id": "1", "cat": "Office", "text": "old"}))
            .unwrap();
        store.insert("t", &json!({"_id": "2", "cat": "Personal"})).unwrap();

        let patch = Patch::from_json(&json!({"text": "new", "tags": ["a"]})).unwrap();
        let ack = store.update("t", &filter(json!({"cat": "Office"})), &patch).unwrap();
        assert_eq!(ack.matched_count, 1);

        let docs = all(&store, "t");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], json!({"_id": "1", "cat": "Office", "text": "new", "tags": ["a"]}));
        assert_eq!(docs[1], json!({"_id": "2", "cat": "Personal"}));
    }

    #[test]
    fn update_without_matches_reports_zero() {
        let store = store();
        store.insert("t", &json!({"_id": "1"})).unwrap();
        let patch = Patch::from_json(&json!({"x": 1})).unwrap();
        let ack = store.update("t", &Filter::by_id("nope"), &patch).unwrap();
        assert_eq!(ack.matched_count, 0);
    }

    #[test]
    fn update_refuses_empty_filter() {
        let store = store();
        let patch = Patch::from_json(&json!({"x": 1})).unwrap();
        assert!(matches!(
            store.update("t", &Filter::all(), &patch),
            Err(StoreError::UnboundedFilter)
        ));
    }
}
