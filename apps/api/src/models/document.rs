use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// One stored candidate or job. `data` holds the document as submitted
/// (merged with later updates); `key` mirrors its `candidate_id` / `job_id`.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub key: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRow {
    /// The document as returned to API callers: stored fields plus `id`,
    /// `created_at` and `updated_at`.
    pub fn into_document(self) -> Value {
        let mut doc = match self.data {
            Value::Object(map) => map,
            other => Map::from_iter([("value".to_string(), other)]),
        };
        doc.insert("id".to_string(), Value::String(self.id.to_string()));
        doc.insert("created_at".to_string(), Value::String(self.created_at.to_rfc3339()));
        doc.insert("updated_at".to_string(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_document_adds_metadata() {
        let id = Uuid::new_v4();
        let row = DocumentRow {
            id,
            key: "CAND001".to_string(),
            data: json!({ "candidate_id": "CAND001", "name": "Ada" }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let doc = row.into_document();
        assert_eq!(doc["name"], "Ada");
        assert_eq!(doc["id"], id.to_string());
        assert!(doc.get("created_at").is_some());
    }
}
