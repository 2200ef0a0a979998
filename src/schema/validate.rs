//! Record validation against JSON schemas
//!
//! Covers the subset of JSON Schema that Singer stream schemas use:
//! `type` (single or union), `properties`, `additionalProperties`, `items`,
//! `anyOf` and `format: date-time`. Unknown keywords are ignored.

use crate::types::{parse_datetime, JsonValue};

/// Validate a value, returning every violation found
///
/// An empty result means the value conforms.
pub fn validate(schema: &JsonValue, value: &JsonValue) -> Vec<String> {
    let mut errors = Vec::new();
    validate_at(schema, value, "$", &mut errors);
    errors
}

fn validate_at(schema: &JsonValue, value: &JsonValue, path: &str, errors: &mut Vec<String>) {
    // `true`, `{}` and non-object schemas accept anything
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(variants) = schema.get("anyOf").and_then(JsonValue::as_array) {
        let matched = variants.iter().any(|v| validate(v, value).is_empty());
        if !matched {
            errors.push(format!("{path}: does not match any allowed schema"));
        }
    }

    if let Some(types) = schema.get("type") {
        let allowed = allowed_types(types);
        if !allowed.is_empty() && !allowed.iter().any(|t| type_matches(t, value)) {
            errors.push(format!(
                "{path}: expected {}, got {}",
                allowed.join(" or "),
                type_name(value)
            ));
            return;
        }
    }

    match value {
        JsonValue::Object(map) => {
            let properties = schema.get("properties").and_then(JsonValue::as_object);

            if let Some(properties) = properties {
                for (key, sub_schema) in properties {
                    if let Some(field) = map.get(key) {
                        validate_at(sub_schema, field, &format!("{path}.{key}"), errors);
                    }
                }
            }

            let is_declared = |key: &str| properties.is_some_and(|p| p.contains_key(key));
            match schema.get("additionalProperties") {
                Some(JsonValue::Bool(false)) => {
                    for key in map.keys().filter(|k| !is_declared(k.as_str())) {
                        errors.push(format!("{path}.{key}: unexpected property"));
                    }
                }
                Some(extra @ JsonValue::Object(_)) => {
                    for (key, field) in map.iter().filter(|(k, _)| !is_declared(k.as_str())) {
                        validate_at(extra, field, &format!("{path}.{key}"), errors);
                    }
                }
                _ => {}
            }
        }
        JsonValue::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_at(item_schema, item, &format!("{path}[{i}]"), errors);
                }
            }
        }
        JsonValue::String(s) => {
            let format = schema.get("format").and_then(JsonValue::as_str);
            if format == Some("date-time") && parse_datetime(s).is_err() {
                errors.push(format!("{path}: '{s}' is not a valid date-time"));
            }
        }
        _ => {}
    }
}

fn allowed_types(types: &JsonValue) -> Vec<&str> {
    match types {
        JsonValue::String(t) => vec![t.as_str()],
        JsonValue::Array(list) => list.iter().filter_map(JsonValue::as_str).collect(),
        _ => Vec::new(),
    }
}

fn type_matches(expected: &str, value: &JsonValue) -> bool {
    match expected {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "number" => value.is_number(),
        "integer" => match value {
            JsonValue::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        _ => true,
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => "integer",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
