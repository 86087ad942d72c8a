//! Dotted field-path navigation.

use serde_json::Value;

/// Resolves a dotted path like `a.b.c` against a document.
///
/// Returns `None` ("undefined") when any intermediate step is missing or is
/// not an object.
pub fn resolve_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Sets the value at a dotted path, creating intermediate objects as needed.
///
/// Fails (returns false) when an existing intermediate is not an object.
pub fn set_path(doc: &mut Value, path: &str, value: Value) -> bool {
    let Some(map) = doc.as_object_mut() else {
        return false;
    };
    let mut segments = path.split('.').peekable();
    let mut current = map;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_owned(), value);
            return true;
        }
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        match entry.as_object_mut() {
            Some(next) => current = next,
            None => return false,
        }
    }
    false
}

/// Removes the value at a dotted path. Returns the removed value, if any.
pub fn remove_path(doc: &mut Value, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.as_object_mut()?.remove(path),
        Some((head, rest)) => remove_path(doc.as_object_mut()?.get_mut(head)?, rest),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_resolve_path() {
        let doc = json!({"a": {"b": {"c": 7}}, "x": 1});
        assert_eq!(resolve_path(&doc, "x"), Some(&json!(1)));
        assert_eq!(resolve_path(&doc, "a.b.c"), Some(&json!(7)));
        assert_eq!(resolve_path(&doc, "a.b"), Some(&json!({"c": 7})));
        assert_eq!(resolve_path(&doc, "a.missing"), None);
        // Non-object intermediate yields undefined
        assert_eq!(resolve_path(&doc, "x.y"), None);
    }

    #[test]
    fn test_set_path() {
        let mut doc = json!({"a": {"b": 1}});
        assert!(set_path(&mut doc, "a.b", json!(2)));
        assert!(set_path(&mut doc, "a.c.d", json!(3)));
        assert!(set_path(&mut doc, "top", json!("v")));
        assert_eq!(doc, json!({"a": {"b": 2, "c": {"d": 3}}, "top": "v"}));

        // Cannot descend through a scalar
        let mut doc = json!({"a": 1});
        assert!(!set_path(&mut doc, "a.b", json!(2)));
    }

    #[test]
    fn test_remove_path() {
        let mut doc = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove_path(&mut doc, "a.b"), Some(json!(1)));
        assert_eq!(doc, json!({"a": {"c": 2}}));
        assert_eq!(remove_path(&mut doc, "a.missing"), None);
        assert_eq!(remove_path(&mut doc, "z"), None);
    }
}
