//! Ordering of an already-loaded page when the data source cannot sort.
//!
//! Items are compared through their serialized JSON form so any
//! `Serialize` row type can be sorted by a dot-separated field path such as
//! `raised_by.name`. Missing and `null` values always end up last, in both
//! directions.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;

use crate::state::{SortConfig, SortDirection};

/// Returns a sorted copy of `items`; the input is left untouched.
pub fn sort_by_field<T: Serialize + Clone>(items: &[T], sort: &SortConfig) -> Vec<T> {
    let mut keyed: Vec<(Value, &T)> = items
        .iter()
        .map(|item| (field_value(item, &sort.field), item))
        .collect();
    keyed.sort_by(|(left, _), (right, _)| compare_values(left, right, sort.direction));
    keyed.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Value at a dot-separated path, `Null` when any segment is missing.
pub fn field_value<T: Serialize>(item: &T, path: &str) -> Value {
    let Ok(root) = serde_json::to_value(item) else {
        return Value::Null;
    };
    let mut current = &root;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(values) => segment.parse::<usize>().ok().and_then(|i| values.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

pub fn compare_values(left: &Value, right: &Value, direction: SortDirection) -> Ordering {
    // Nulls are placed before the direction is applied, so they stay last.
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = compare_present(left, right);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

fn compare_present(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::String(a), Value::String(b)) => match (parse_instant(a), parse_instant(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => compare_text(a, b),
        },
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

/// Case-insensitive, then byte order. Not locale-aware: accented letters
/// sort after `z`.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
#[path = "tests/client_sort_tests.rs"]
mod tests;
