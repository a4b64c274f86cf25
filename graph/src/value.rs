//! A small JSON-shaped sum type for `TokenMetadata`.
//!
//! Graph-node's original approach reflected over `serde_json::Value` directly
//! wherever metadata needed inspecting. Per the redesign note in spec.md §9,
//! we instead give metadata its own `Value` type with a single depth-limited
//! search helper, so callers never reach for ad hoc recursive `match`es over
//! a JSON library type.

use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Num(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Object(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Depth-first search over `value` for the first string found under any key
/// in `keys`, capped at `max_depth` levels of nesting.
///
/// Used by the Pipeline's materialization step to pull `name`/`description`
/// out of whatever shape the token's metadata JSON happens to have (spec.md
/// §4.7 step 1).
pub fn find_first_string(value: &Value, keys: &[&str], max_depth: usize) -> Option<String> {
    fn go(value: &Value, keys: &[&str], depth_left: usize) -> Option<String> {
        if depth_left == 0 {
            return None;
        }
        match value {
            Value::Object(map) => {
                for key in keys {
                    if let Some(Value::String(s)) = map.get(*key) {
                        if !s.is_empty() {
                            return Some(s.clone());
                        }
                    }
                }
                for child in map.values() {
                    if let Some(found) = go(child, keys, depth_left - 1) {
                        return Some(found);
                    }
                }
                None
            }
            Value::Array(items) => {
                for item in items {
                    if let Some(found) = go(item, keys, depth_left - 1) {
                        return Some(found);
                    }
                }
                None
            }
            _ => None,
        }
    }
    go(value, keys, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn finds_name_at_top_level() {
        let v = obj(vec![("name", Value::String("X".into()))]);
        assert_eq!(find_first_string(&v, &["name", "description"], 4), Some("X".into()));
    }

    #[test]
    fn finds_name_nested_under_properties() {
        let v = obj(vec![(
            "properties",
            obj(vec![("name", Value::String("Nested".into()))]),
        )]);
        assert_eq!(find_first_string(&v, &["name"], 4), Some("Nested".into()));
    }

    #[test]
    fn respects_max_depth() {
        let v = obj(vec![(
            "a",
            obj(vec![("b", obj(vec![("name", Value::String("TooDeep".into()))]))]),
        )]);
        assert_eq!(find_first_string(&v, &["name"], 2), None);
        assert_eq!(find_first_string(&v, &["name"], 3), Some("TooDeep".into()));
    }

    #[test]
    fn skips_empty_strings() {
        let v = obj(vec![
            ("name", Value::String("".into())),
            ("title", Value::String("Fallback".into())),
        ]);
        assert_eq!(find_first_string(&v, &["name", "title"], 2), Some("Fallback".into()));
    }

    #[test]
    fn converts_from_serde_json() {
        let j = serde_json::json!({"name": "X", "n": 3, "ok": true, "arr": [1, "y"]});
        let v: Value = j.into();
        let map = v.as_object().unwrap();
        assert_eq!(map.get("name").unwrap().as_str(), Some("X"));
    }
}
