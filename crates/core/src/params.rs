//! Loosely-typed effect parameters.
//!
//! Effects receive a JSON object of overrides from the command line or a
//! scene file. Scalar lookups fall back to a default when a key is missing
//! or has the wrong type; [`merge`] layers an override object onto a preset.

use serde_json::{Map, Value};

/// `params[name]` as a number, or `default`.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// `params[name]` as a non-negative integer, or `default`.
pub fn param_u64(params: &Value, name: &str, default: u64) -> u64 {
    params.get(name).and_then(Value::as_u64).unwrap_or(default)
}

/// `params[name]` as a string slice, if present.
pub fn param_str<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

/// Deep-merges `overrides` into `base`.
///
/// Objects merge key by key unless the override selects a different enum
/// variant; that, and any other override value (including arrays and
/// `null`), replaces the base value outright.
pub fn merge(base: &mut Value, overrides: &Value) {
    if let (Some(map), Value::Object(over)) = (base.as_object_mut(), overrides) {
        if !switches_variant(map, over) {
            for (key, value) in over {
                merge(map.entry(key.clone()).or_insert(Value::Null), value);
            }
            return;
        }
    }
    *base = overrides.clone();
}

/// A different `kind` tag, or a different sole key for externally tagged
/// enums such as `{"count": n}` vs `{"columns": n}`.
fn switches_variant(base: &Map<String, Value>, over: &Map<String, Value>) -> bool {
    if let (Some(a), Some(b)) = (base.get("kind"), over.get("kind")) {
        return a != b;
    }
    base.len() == 1 && over.len() == 1 && base.keys().next() != over.keys().next()
}

/// Removes `keys` from an object, returning the rest. Non-objects become `{}`.
pub fn without(params: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    if let Value::Object(map) = params {
        for (k, v) in map {
            if !keys.contains(&k.as_str()) {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    Value::Object(out)
}
