//! Record-set and single-object accessors used by the generic views

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::pagination::{Page, Paginator};
use super::request::RequestParts;
use crate::config::{PaginationConfig, ViewsConfig};
use crate::handlers::{is_truthy, DataMap};
use crate::models::schema::public_record;
use crate::store::{order_by, value_matches, Record, RecordSet, StoreError};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("primary key '{field}' not provided in {scope}")]
    MissingPk { field: String, scope: PkScope },

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where the primary key of a single-object lookup comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PkScope {
    /// Query string
    Params,
    /// Request payload
    Body,
    /// URL path parameters
    Kwargs,
}

impl fmt::Display for PkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PkScope::Params => "PARAMS",
            PkScope::Body => "BODY",
            PkScope::Kwargs => "KWARGS",
        })
    }
}

/// Narrows a record set from request query parameters
pub trait RecordFilter: Send + Sync {
    fn filter_records(&self, records: Vec<Record>, _query: &DataMap) -> Vec<Record> {
        records
    }
}

/// Identity filter
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl RecordFilter for NoFilter {}

/// Exact-match filter over a declared set of fields
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    fields: Vec<&'static str>,
}

impl FieldFilter {
    pub fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }
}

impl RecordFilter for FieldFilter {
    fn filter_records(&self, records: Vec<Record>, query: &DataMap) -> Vec<Record> {
        let active: Vec<(&str, &Value)> = self
            .fields
            .iter()
            .filter_map(|field| query.get(*field).map(|value| (*field, value)))
            .collect();

        records
            .into_iter()
            .filter(|record| {
                active.iter().all(|(field, expected)| {
                    record
                        .get(*field)
                        .is_some_and(|actual| value_matches(actual, expected))
                })
            })
            .collect()
    }
}

/// Resolves the active record set with filtering, ordering and pagination
pub struct QuerysetAccessor<'a> {
    records: RecordSet,
    views: &'a ViewsConfig,
    pagination: &'a PaginationConfig,
    filter: &'a dyn RecordFilter,
}

impl<'a> QuerysetAccessor<'a> {
    pub fn new(
        records: RecordSet,
        views: &'a ViewsConfig,
        pagination: &'a PaginationConfig,
        filter: &'a dyn RecordFilter,
    ) -> Self {
        Self {
            records,
            views,
            pagination,
            filter,
        }
    }

    /// Requested ordering, or the configured default
    pub fn ordering(&self, query: &DataMap) -> String {
        query
            .get(&self.views.ordering_param_name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|ordering| !ordering.is_empty())
            .unwrap_or(self.views.default_ordering_field.as_str())
            .to_string()
    }

    /// Filtered and ordered records
    pub fn ordered(&self, request: &RequestParts) -> Result<Vec<Record>, LookupError> {
        let records = self.records.all()?;
        let mut records = self.filter.filter_records(records, &request.query);
        order_by(&mut records, &self.ordering(&request.query));
        Ok(records)
    }

    pub fn paginate(&self, request: &RequestParts) -> Result<Page, LookupError> {
        let entity = self.records.entity();
        let items = self
            .ordered(request)?
            .into_iter()
            .map(|record| public_record(entity, record))
            .collect();
        Paginator::new(self.pagination).paginate(items, &request.query)
    }
}

/// Resolves exactly one record through a primary-key lookup scope
#[derive(Clone)]
pub struct ObjectAccessor {
    records: RecordSet,
    scope: PkScope,
    field: String,
}

impl ObjectAccessor {
    pub fn new(records: RecordSet, scope: PkScope, field: impl Into<String>) -> Self {
        Self {
            records,
            scope,
            field: field.into(),
        }
    }

    /// Key value taken from the configured source only
    pub fn pk_value(&self, request: &RequestParts) -> Result<Value, LookupError> {
        let source = match self.scope {
            PkScope::Params => &request.query,
            PkScope::Body => &request.body,
            PkScope::Kwargs => &request.kwargs,
        };

        source
            .get(&self.field)
            .filter(|value| is_truthy(value))
            .cloned()
            .ok_or_else(|| LookupError::MissingPk {
                field: self.field.clone(),
                scope: self.scope,
            })
    }

    pub fn filterset_for_pk(&self, request: &RequestParts) -> Result<DataMap, LookupError> {
        let mut filters = DataMap::new();
        filters.insert(self.field.clone(), self.pk_value(request)?);
        Ok(filters)
    }

    pub fn get_object(&self, request: &RequestParts) -> Result<Record, LookupError> {
        let filters = self.filterset_for_pk(request)?;
        Ok(self.records.get(&filters)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;
    use crate::store::RecordStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn map(value: Value) -> DataMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn seeded() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("db")).unwrap();
        let india = store.insert(Entity::Country, map(json!({"name": "India"}))).unwrap();
        store.insert(Entity::Country, map(json!({"name": "Nepal"}))).unwrap();
        store
            .insert(Entity::State, map(json!({"name": "Kerala", "country": india["id"]})))
            .unwrap();
        store
            .insert(Entity::State, map(json!({"name": "Assam", "country": india["id"]})))
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_ordering_param_and_default() {
        let (_dir, store) = seeded();
        let views = ViewsConfig::default();
        let pagination = PaginationConfig::default();
        let accessor =
            QuerysetAccessor::new(store.record_set(Entity::State), &views, &pagination, &NoFilter);

        assert_eq!(accessor.ordering(&DataMap::new()), "-created_at");

        let request = RequestParts {
            query: map(json!({"ordering": "name"})),
            ..Default::default()
        };
        let names: Vec<Value> = accessor
            .ordered(&request)
            .unwrap()
            .into_iter()
            .map(|r| r["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("Assam"), json!("Kerala")]);
    }

    #[test]
    fn test_field_filter() {
        let (_dir, store) = seeded();
        let views = ViewsConfig::default();
        let pagination = PaginationConfig::default();
        let filter = FieldFilter::new(&["name"]);
        let accessor =
            QuerysetAccessor::new(store.record_set(Entity::Country), &views, &pagination, &filter);

        let request = RequestParts {
            query: map(json!({"name": "Nepal", "unrelated": "x"})),
            ..Default::default()
        };
        let page = accessor.paginate(&request).unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0]["name"], "Nepal");
    }

    #[test]
    fn test_pk_from_configured_scope_only() {
        let (_dir, store) = seeded();
        let accessor = ObjectAccessor::new(store.record_set(Entity::Country), PkScope::Params, "id");

        let request = RequestParts {
            body: map(json!({"id": "1"})),
            kwargs: map(json!({"id": "1"})),
            ..Default::default()
        };
        let err = accessor.get_object(&request).unwrap_err();
        assert_eq!(err.to_string(), "primary key 'id' not provided in PARAMS");

        let request = RequestParts {
            query: map(json!({"id": "2"})),
            ..Default::default()
        };
        assert_eq!(accessor.get_object(&request).unwrap()["name"], "Nepal");
    }

    #[test]
    fn test_lookup_by_non_unique_field() {
        let (_dir, store) = seeded();
        let accessor = ObjectAccessor::new(store.record_set(Entity::State), PkScope::Kwargs, "country");

        let request = RequestParts {
            kwargs: map(json!({"country": "1"})),
            ..Default::default()
        };
        assert!(matches!(
            accessor.get_object(&request),
            Err(LookupError::Store(StoreError::MultipleReturned { count: 2, .. }))
        ));
    }
}
