//! Deep merge of JSON objects
//!
//! Keys missing from the target are inserted. When both sides hold an object
//! the merge descends into it; arrays and scalars are treated as leaves and
//! replaced only when `overwrite` is set.

use serde_json::{Map, Value};

/// Merge `source` into `target` in place.
pub fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>, overwrite: bool) {
    // Explicit stack instead of recursion; facts documents come from users.
    let mut stack: Vec<(&mut Map<String, Value>, &Map<String, Value>)> = vec![(target, source)];

    while let Some((target, source)) = stack.pop() {
        let mut descend = Vec::new();
        for (key, value) in source {
            match target.get(key) {
                None => {
                    target.insert(key.clone(), value.clone());
                }
                Some(Value::Object(_)) if value.is_object() => descend.push(key),
                Some(_) => {
                    if overwrite {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        // Borrow each nested pair only after the scalar pass is done.
        let mut nested: Vec<(&mut Map<String, Value>, &Map<String, Value>)> = Vec::new();
        for (key, child) in target {
            if !descend.contains(&key) {
                continue;
            }
            if let (Value::Object(child_target), Some(Value::Object(child_source))) =
                (child, source.get(key))
            {
                nested.push((child_target, child_source));
            }
        }
        stack.extend(nested);
    }
}

/// Merge `source` into a copy of `target`
pub fn merged(target: &Value, source: &Value, overwrite: bool) -> Value {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            let mut out = target.clone();
            merge_into(&mut out, source, overwrite);
            Value::Object(out)
        }
        (_, _) if overwrite => source.clone(),
        (_, _) => target.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_inserts_missing_keys() {
        let out = merged(&json!({"a": 1}), &json!({"b": 2}), false);
        assert_eq!(out, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_merge_recurses_into_objects() {
        let out = merged(
            &json!({"net": {"ip": "10.0.0.1", "dns": {"primary": "a"}}}),
            &json!({"net": {"dns": {"secondary": "b"}}}),
            true,
        );
        assert_eq!(
            out,
            json!({"net": {"ip": "10.0.0.1", "dns": {"primary": "a", "secondary": "b"}}})
        );
    }

    #[test]
    fn test_arrays_are_leaves() {
        let out = merged(&json!({"tags": ["a"]}), &json!({"tags": ["b"]}), true);
        assert_eq!(out, json!({"tags": ["b"]}));

        let kept = merged(&json!({"tags": ["a"]}), &json!({"tags": ["b"]}), false);
        assert_eq!(kept, json!({"tags": ["a"]}));
    }

    #[test]
    fn test_object_does_not_replace_scalar_without_overwrite() {
        let out = merged(&json!({"os": "linux"}), &json!({"os": {"name": "bsd"}}), false);
        assert_eq!(out, json!({"os": "linux"}));
    }
}
