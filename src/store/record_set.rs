use std::cmp::Ordering;

use serde_json::Value;

use crate::models::schema::Entity;

use super::error::{Result, StoreError};
use super::store::{Record, RecordStore};

/// The set of records of one entity that a view operates on
#[derive(Clone)]
pub struct RecordSet {
    store: RecordStore,
    entity: Entity,
}

impl RecordSet {
    pub fn new(store: RecordStore, entity: Entity) -> Self {
        Self { store, entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn all(&self) -> Result<Vec<Record>> {
        self.store.all(self.entity)
    }

    /// Records whose fields match every filter value
    pub fn filter(&self, filters: &Record) -> Result<Vec<Record>> {
        let records = self.all()?;
        Ok(records
            .into_iter()
            .filter(|record| matches_all(record, filters))
            .collect())
    }

    /// Resolve exactly one record matching `filters`
    pub fn get(&self, filters: &Record) -> Result<Record> {
        let mut matches: Vec<Record> = match filters.get("id") {
            Some(id) if filters.len() == 1 => self.store.get(self.entity, id)?.into_iter().collect(),
            _ => self.filter(filters)?,
        };

        match matches.len() {
            0 => Err(StoreError::NotFound {
                entity: self.entity.label(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(StoreError::MultipleReturned {
                entity: self.entity.label(),
                count,
            }),
        }
    }
}

fn matches_all(record: &Record, filters: &Record) -> bool {
    filters.iter().all(|(field, expected)| {
        record
            .get(field)
            .is_some_and(|actual| value_matches(actual, expected))
    })
}

/// Equality that tolerates text vs typed scalars, since query strings and
/// path segments always arrive as text
pub fn value_matches(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (scalar_text(actual), scalar_text(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Sort records by a comma separated ordering such as `-created_at,name`.
///
/// A leading `-` sorts that field descending. Nulls sort first ascending.
pub fn order_by(records: &mut [Record], ordering: &str) {
    let keys: Vec<(&str, bool)> = ordering
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key, false),
        })
        .collect();

    if keys.is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ordering = compare_values(
                a.get(*field).unwrap_or(&Value::Null),
                b.get(*field).unwrap_or(&Value::Null),
            );
            let ordering = if *descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_value_matches_text_and_numbers() {
        assert!(value_matches(&json!(3), &json!("3")));
        assert!(value_matches(&json!(true), &json!("true")));
        assert!(!value_matches(&json!(null), &json!("null")));
        assert!(!value_matches(&json!(3), &json!("4")));
    }

    #[test]
    fn test_order_by_multiple_fields() {
        let mut records = vec![
            record(json!({"name": "b", "rank": 1})),
            record(json!({"name": "a", "rank": 2})),
            record(json!({"name": "c", "rank": 2})),
            record(json!({"name": "d", "rank": null})),
        ];

        order_by(&mut records, "-rank,name");

        let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_get_not_found_and_multiple() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("db")).unwrap();
        store
            .insert(Entity::Country, record(json!({"name": "India"})))
            .unwrap();
        store
            .insert(Entity::Country, record(json!({"name": "India"})))
            .unwrap();

        let countries = store.record_set(Entity::Country);

        let err = countries.get(&record(json!({"name": "India"}))).unwrap_err();
        assert!(matches!(err, StoreError::MultipleReturned { count: 2, .. }));

        let err = countries.get(&record(json!({"id": "42"}))).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let found = countries.get(&record(json!({"id": "2"}))).unwrap();
        assert_eq!(found["id"], json!(2));
    }
}
