//! Dotted-path access and JSON value coercions.

use serde_json::{Map, Number, Value};

/// Looks up a dotted path (`abilities.str.mod`) inside a JSON tree.
///
/// Numeric segments index into arrays.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Writes `value` at a dotted path, creating intermediate objects.
///
/// Returns false if the path runs through a non-object value, in which case
/// nothing is written.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> bool {
    let mut segments = path.split('.').peekable();
    let mut node = root;

    while let Some(segment) = segments.next() {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return false;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return true;
        }
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    false
}

/// Converts a number to JSON, keeping integral values as integers.
///
/// Non-finite numbers become `null`.
pub fn number(value: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

/// Loose numeric coercion.
///
/// Numbers pass through, booleans become 0/1, `null` and blank strings become
/// 0, numeric strings are parsed. Arrays, objects and other strings have no
/// numeric value.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Lowercase slug used for item and class identifiers.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn get_path_walks_objects_and_arrays() {
        let doc = json!({ "a": { "b": [10, { "c": 3 }] } });
        assert_eq!(get_path(&doc, "a.b.0"), Some(&json!(10)));
        assert_eq!(get_path(&doc, "a.b.1.c"), Some(&json!(3)));
        assert_eq!(get_path(&doc, "a.x"), None);
        assert_eq!(get_path(&doc, "a.b.c"), None);
    }

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut doc = json!({});
        assert!(set_path(&mut doc, "scale.rogue.sneak-attack", json!("3d6")));
        assert_eq!(doc, json!({ "scale": { "rogue": { "sneak-attack": "3d6" } } }));
    }

    #[test]
    fn set_path_refuses_to_clobber_scalars() {
        let mut doc = json!({ "a": 5 });
        assert!(!set_path(&mut doc, "a.b", json!(1)));
        assert_eq!(doc, json!({ "a": 5 }));
    }

    #[test]
    fn numbers_stay_integral_when_possible() {
        assert_eq!(number(3.0), json!(3));
        assert_eq!(number(2.5), json!(2.5));
        assert_eq!(number(f64::NAN), Value::Null);
    }

    #[test]
    fn loose_number_coercion() {
        assert_eq!(coerce_number(&json!("4")), Some(4.0));
        assert_eq!(coerce_number(&json!(" ")), Some(0.0));
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
        assert_eq!(coerce_number(&json!("int")), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Sneak Attack"), "sneak-attack");
        assert_eq!(slugify("  Rogue!! "), "rogue");
    }
}
