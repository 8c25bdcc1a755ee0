//! The document store: named collections of JSON documents over SQLite.
//!
//! Every document is a JSON object carrying a string `_id`. The store owns
//! id generation (UUID v4) and evaluates the typed [`Filter`] tree itself;
//! callers never see SQL. Writes serialize on the single shared connection.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};
use serde_json::Value;
use uuid::Uuid;

use super::filter::{Filter, FindOptions, Projection, UpdateSpec};
use super::{sqlite, StoreError};

/// A document body: a JSON object including its `_id` field.
pub type Document = serde_json::Map<String, Value>;

/// Cloneable handle to the process-wide document store.
///
/// Opened once at startup and passed explicitly to every component that
/// reads or writes; there is no module-level singleton.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentStore {
    /// Open (and migrate) the backing database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = sqlite::open_database(path)?;
        Ok(DocumentStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = sqlite::open_memory_database()?;
        Ok(DocumentStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Handle to a named collection. Collections need no declaration; an
    /// unknown name is simply an empty collection.
    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection {
            store: self.clone(),
            name: name.into(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Collection-scoped operations: find, insert, bulk update, bulk delete.
pub struct Collection {
    store: DocumentStore,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return all documents matching `filter`, in insertion order, after
    /// applying `options` (skip, then limit) and the optional projection.
    pub fn find(
        &self,
        filter: &Filter,
        options: &FindOptions,
        projection: Option<&Projection>,
    ) -> Result<Vec<Document>, StoreError> {
        filter.validate()?;
        let conn = self.store.lock()?;
        let mut docs: Vec<Document> = self
            .scan(&conn, filter)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect();
        if let Some(skip) = options.skip {
            let skip = skip.min(docs.len() as u64) as usize;
            docs.drain(..skip);
        }
        if let Some(limit) = options.limit {
            docs.truncate(limit as usize);
        }
        if let Some(projection) = projection {
            docs = docs.into_iter().map(|doc| projection.apply(doc)).collect();
        }
        Ok(docs)
    }

    /// Count documents matching `filter`.
    pub fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        filter.validate()?;
        let conn = self.store.lock()?;
        Ok(self.scan(&conn, filter)?.len() as u64)
    }

    /// Insert one document. A missing `_id` is filled with a fresh UUID;
    /// a caller-supplied `_id` must be a string. Returns the stored body.
    pub fn insert_one(&self, mut doc: Document) -> Result<Document, StoreError> {
        let id = match doc.get("_id") {
            None => {
                let id = Uuid::new_v4().to_string();
                doc.insert("_id".to_string(), Value::String(id.clone()));
                id
            }
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(StoreError::Corrupt(format!(
                    "_id must be a string, got {other}"
                )))
            }
        };
        let body = Value::Object(doc.clone()).to_string();
        let conn = self.store.lock()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
            params![self.name, id, body],
        )?;
        Ok(doc)
    }

    /// Apply `update` to every document matching `filter`.
    /// Returns the number of documents actually modified.
    pub fn update_many(&self, filter: &Filter, update: &UpdateSpec) -> Result<u64, StoreError> {
        filter.validate()?;
        update.validate()?;
        let conn = self.store.lock()?;
        let mut modified = 0u64;
        for (id, mut doc) in self.scan(&conn, filter)? {
            if update.apply(&mut doc) {
                conn.execute(
                    "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
                    params![Value::Object(doc).to_string(), self.name, id],
                )?;
                modified += 1;
            }
        }
        Ok(modified)
    }

    /// Delete every document matching `filter`. Returns the deleted count.
    pub fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        filter.validate()?;
        let conn = self.store.lock()?;
        let mut deleted = 0u64;
        for (id, _) in self.scan(&conn, filter)? {
            deleted += conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![self.name, id],
            )? as u64;
        }
        Ok(deleted)
    }

    fn scan(
        &self,
        conn: &Connection,
        filter: &Filter,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![self.name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut matching = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let doc = match serde_json::from_str::<Value>(&body) {
                Ok(Value::Object(map)) => map,
                _ => return Err(StoreError::Corrupt(format!("{}/{id}", self.name))),
            };
            if filter.matches(&doc) {
                matching.push((id, doc));
            }
        }
        Ok(matching)
    }
}
