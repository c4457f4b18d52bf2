//! In-memory `DocumentStore` used by handler and assistant tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::records::store::{Collection, DocumentStore};

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<Collection, Vec<DocumentRow>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document, keyed by its own key field.
    pub fn with(self, collection: Collection, data: Value) -> Self {
        let key = data[collection.key_field()]
            .as_str()
            .expect("seed document needs a string key")
            .to_string();
        let now = Utc::now();
        self.docs.lock().unwrap().entry(collection).or_default().push(DocumentRow {
            id: Uuid::new_v4(),
            key,
            data,
            created_at: now,
            updated_at: now,
        });
        self
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<DocumentRow>, AppError> {
        Ok(self.docs.lock().unwrap().get(&collection).cloned().unwrap_or_default())
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<DocumentRow>, AppError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .get(&collection)
            .and_then(|rows| rows.iter().find(|r| r.key == key))
            .cloned())
    }

    async fn insert(&self, collection: Collection, key: &str, data: Value) -> Result<Uuid, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let rows = docs.entry(collection).or_default();
        if rows.iter().any(|r| r.key == key) {
            return Err(AppError::Validation(format!(
                "{} {key} already exists",
                collection.label()
            )));
        }
        let id = Uuid::new_v4();
        let now = Utc::now();
        rows.push(DocumentRow {
            id,
            key: key.to_string(),
            data,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        patch: Map<String, Value>,
    ) -> Result<bool, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let Some(row) = docs
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|r| r.key == key))
        else {
            return Ok(false);
        };
        if let Value::Object(data) = &mut row.data {
            data.extend(patch);
        }
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, AppError> {
        let mut docs = self.docs.lock().unwrap();
        let Some(rows) = docs.get_mut(&collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| r.key != key);
        Ok(rows.len() < before)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
