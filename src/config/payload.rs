// src/config/payload.rs

//! Helpers for assembling task payloads from plan tables.

use toml::{Table, Value};

/// Fill keys missing from `payload` with values from `defaults`.
///
/// Nested tables are merged key by key; any other value already present in
/// `payload` wins.
pub fn merge_defaults(payload: &mut Table, defaults: &Table) {
    for (key, default) in defaults {
        match (payload.get_mut(key), default) {
            (Some(Value::Table(own)), Value::Table(nested)) => merge_defaults(own, nested),
            (Some(_), _) => {}
            (None, _) => {
                payload.insert(key.clone(), default.clone());
            }
        }
    }
}

/// Drop empty strings, arrays and tables, recursing into nested tables.
pub fn compact_blank(table: &mut Table) {
    for (_, value) in table.iter_mut() {
        if let Value::Table(nested) = value {
            compact_blank(nested);
        }
    }

    let blank: Vec<String> = table
        .iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(key, _)| key.clone())
        .collect();
    for key in blank {
        table.remove(&key);
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Table(t) => t.is_empty(),
        _ => false,
    }
}
