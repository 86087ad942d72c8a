//! Document helpers: reserved system fields, id generation, timestamps.
//!
//! Documents are JSON objects (`serde_json::Value::Object`) whose reserved
//! fields live inside the object itself, exactly as they appear in the
//! persisted image and the export tree.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Reserved field holding the document id.
pub const FIELD_ID: &str = "_id";
/// Reserved field holding the creation timestamp.
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Reserved field holding the last-write timestamp.
pub const FIELD_UPDATED_AT: &str = "updatedAt";

/// The reserved system fields every document carries.
pub const RESERVED_FIELDS: [&str; 3] = [FIELD_ID, FIELD_CREATED_AT, FIELD_UPDATED_AT];

/// Returns true if `name` is one of the reserved system fields.
pub fn is_reserved_field(name: &str) -> bool { RESERVED_FIELDS.contains(&name) }

/// Generates a fresh document id.
///
/// Ids are collision-resistant random strings with embedded time entropy;
/// the unique check on `_id` at insert time remains the authoritative guard.
pub fn generate_id() -> String { cuid2::create_id() }

/// Returns the `_id` of a document, if present and a string.
pub fn document_id(doc: &Value) -> Option<&str> { doc.get(FIELD_ID).and_then(Value::as_str) }

/// Renders an instant the way it is stored on disk: RFC 3339 in UTC with
/// millisecond precision.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current instant in stored form.
pub fn now_string() -> String { format_instant(Utc::now()) }

/// Parses a stored or user-supplied date value.
///
/// Accepts any RFC 3339 timestamp, normalizing to UTC.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_reserved_fields() {
        assert!(is_reserved_field("_id"));
        assert!(is_reserved_field("createdAt"));
        assert!(is_reserved_field("updatedAt"));
        assert!(!is_reserved_field("email"));
    }

    #[test]
    fn test_generate_id_unique_and_nonempty() {
        let a = generate_id();
        let b = generate_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn test_document_id() {
        let doc = json!({"_id": "abc", "name": "x"});
        assert_eq!(document_id(&doc), Some("abc"));
        assert_eq!(document_id(&json!({"name": "x"})), None);
        assert_eq!(document_id(&json!({"_id": 42})), None);
    }

    #[test]
    fn test_instant_roundtrip() {
        let now = now_string();
        let parsed = parse_instant(&now).unwrap();
        assert_eq!(format_instant(parsed), now);
    }

    #[test]
    fn test_parse_instant_accepts_offsets() {
        let parsed = parse_instant("2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(format_instant(parsed), "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn test_parse_instant_rejects_garbage() {
        assert!(parse_instant("yesterday").is_none());
    }
}
