//! Document projection utilities.

use serde_json::{Map, Value};

use super::path::{resolve_path, set_path};
use crate::document;

/// Projects a document to the named field paths.
///
/// Reserved system fields are always retained. An empty projection returns
/// the document unchanged. Dotted paths rebuild their nested shape in the
/// projected output.
pub fn project_document(doc: &Value, fields: &[String]) -> Value {
    if fields.is_empty() {
        return doc.clone();
    }
    let mut projected = Value::Object(Map::new());
    for name in document::RESERVED_FIELDS {
        if let Some(value) = doc.get(name) {
            set_path(&mut projected, name, value.clone());
        }
    }
    for field in fields {
        if let Some(value) = resolve_path(doc, field) {
            set_path(&mut projected, field, value.clone());
        }
    }
    projected
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({
            "_id": "d1",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "name": "Alice",
            "age": 25,
            "address": {"city": "Oslo", "zip": "0150"},
        })
    }

    #[test]
    fn test_empty_projection_returns_everything() {
        assert_eq!(project_document(&doc(), &[]), doc());
    }

    #[test]
    fn test_projection_keeps_named_and_system_fields() {
        let projected = project_document(&doc(), &["name".to_owned()]);
        let map = projected.as_object().unwrap();
        assert_eq!(map["name"], json!("Alice"));
        assert_eq!(map["_id"], json!("d1"));
        assert!(map.contains_key("createdAt"));
        assert!(!map.contains_key("age"));
        assert!(!map.contains_key("address"));
    }

    #[test]
    fn test_projection_missing_fields_skipped() {
        let projected = project_document(&doc(), &["name".to_owned(), "ghost".to_owned()]);
        let map = projected.as_object().unwrap();
        assert!(map.contains_key("name"));
        assert!(!map.contains_key("ghost"));
    }

    #[test]
    fn test_projection_dotted_path() {
        let projected = project_document(&doc(), &["address.city".to_owned()]);
        assert_eq!(projected["address"], json!({"city": "Oslo"}));
    }
}
