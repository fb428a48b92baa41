//! Country, state and city handlers

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::traits::{Handler, HandlerError};
use super::types::{
    required_field_validation, DataMap, ErrorMessage, HandlerContext, ValidatedData,
    TOAST_MESSAGE_KEY,
};
use crate::models::schema::public_record;
use crate::models::{AuditColumns, City, Country, Entity, Model, State};
use crate::store::{value_matches, Record};

fn required_fields(entity: Entity) -> &'static [(&'static str, &'static str)] {
    match entity {
        Entity::State => &[
            ("name", "State name is required"),
            ("country", "Country is required"),
        ],
        Entity::City => &[
            ("name", "City name is required"),
            ("state", "State is required"),
            ("country", "Country is required"),
        ],
        _ => &[("name", "Country name is required")],
    }
}

/// Parent references of a region entity
fn parent_fields(entity: Entity) -> &'static [(&'static str, Entity)] {
    match entity {
        Entity::State => &[("country", Entity::Country)],
        Entity::City => &[("state", Entity::State), ("country", Entity::Country)],
        _ => &[],
    }
}

fn as_u64(data: &ValidatedData, key: &str) -> Result<u64, HandlerError> {
    data.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| HandlerError::Fatal(format!("{key} was not validated")))
}

/// Check that parent references exist and normalize them to ids.
///
/// Returns false after recording a field error.
fn validate_parents(
    ctx: &HandlerContext,
    entity: Entity,
    data: &mut ValidatedData,
) -> Result<bool, HandlerError> {
    for (field, parent) in parent_fields(entity) {
        let Some(raw) = data.get(field).cloned() else {
            continue;
        };
        let store = ctx.records.store();
        let parent_record = match parent.parse_id(&raw) {
            Some(id) => store.get(*parent, &id)?,
            None => None,
        };
        let Some(parent_record) = parent_record else {
            data.set_error_message(
                &ErrorMessage::new(format!("Invalid {}", parent.label()), "does not exist"),
                Some(*field),
                true,
            );
            return Ok(false);
        };
        data.insert(*field, parent_record.get("id").cloned().unwrap_or(Value::Null));
    }

    // A city's state must belong to the same country. On update the side
    // not being changed comes from the stored instance.
    if entity == Entity::City && (data.get("state").is_some() || data.get("country").is_some()) {
        let current = |field: &str| {
            data.get(field)
                .or_else(|| ctx.instance.as_ref().and_then(|instance| instance.get(field)))
                .cloned()
        };
        if let (Some(state_id), Some(country_id)) = (current("state"), current("country")) {
            let state = ctx
                .records
                .store()
                .get(Entity::State, &state_id)?
                .unwrap_or_default();
            let consistent = state
                .get("country")
                .is_some_and(|value| value_matches(value, &country_id));
            if !consistent {
                data.set_error_message(
                    &ErrorMessage::new(
                        "Invalid State",
                        "does not belong to the selected country",
                    ),
                    Some("state"),
                    true,
                );
                return Ok(false);
            }
        }
    }

    Ok(true)
}

fn trimmed_name(data: &mut ValidatedData) {
    if let Some(name) = data.get_str("name").map(|name| name.trim().to_string()) {
        data.insert("name", Value::String(name));
    }
}

fn instance_id(ctx: &HandlerContext) -> Result<Value, HandlerError> {
    ctx.instance
        .as_ref()
        .and_then(|instance| instance.get("id").cloned())
        .ok_or_else(|| HandlerError::Fatal("instance was not resolved".to_string()))
}

/// Creates a country, state or city
pub struct RegionCreate {
    ctx: HandlerContext,
    entity: Entity,
}

impl RegionCreate {
    pub fn new(ctx: HandlerContext, entity: Entity) -> Self {
        Self { ctx, entity }
    }

    fn build_record(&self, data: &ValidatedData) -> Result<Record, HandlerError> {
        let name = data.get_str("name").unwrap_or_default().to_string();
        let audit = AuditColumns::default();

        let record = match self.entity {
            Entity::Country => Country {
                id: None,
                name,
                audit,
            }
            .to_record()?,
            Entity::State => State {
                id: None,
                name,
                country: as_u64(data, "country")?,
                audit,
            }
            .to_record()?,
            Entity::City => City {
                id: None,
                name,
                state: as_u64(data, "state")?,
                country: as_u64(data, "country")?,
                audit,
            }
            .to_record()?,
            other => {
                return Err(HandlerError::Fatal(format!(
                    "{} is not a region entity",
                    other.label()
                )))
            }
        };
        Ok(record)
    }
}

#[async_trait]
impl Handler for RegionCreate {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        let mut data = ValidatedData::new(data);

        if let Some(missing) = required_field_validation(data.as_map(), required_fields(self.entity)) {
            data.set_missing_field(&missing);
            return Ok(data);
        }

        trimmed_name(&mut data);
        if !validate_parents(&self.ctx, self.entity, &mut data)? {
            return Ok(data);
        }

        data.set_toast_message_value(self.entity.label());
        Ok(data)
    }

    async fn create(&mut self, data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let record = self.build_record(data)?;
        let created = self.ctx.records.store().insert(self.entity, record)?;
        debug!(entity = self.entity.table(), "Region created");
        Ok(public_record(self.entity, created))
    }
}

/// Updates the resolved country, state or city
pub struct RegionUpdate {
    ctx: HandlerContext,
    entity: Entity,
}

impl RegionUpdate {
    pub fn new(ctx: HandlerContext, entity: Entity) -> Self {
        Self { ctx, entity }
    }
}

#[async_trait]
impl Handler for RegionUpdate {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        instance_id(&self.ctx)?;

        let mut changes = DataMap::new();
        if let Some(name) = data.get("name") {
            changes.insert("name".to_string(), name.clone());
        }
        for (field, _) in parent_fields(self.entity) {
            if let Some(value) = data.get(*field) {
                changes.insert((*field).to_string(), value.clone());
            }
        }

        let mut data = ValidatedData::new(changes);
        if data.is_empty() {
            data.set_error_message(
                &ErrorMessage::new("Nothing to update", "Provide at least one field to change"),
                None,
                false,
            );
            return Ok(data);
        }

        if data.get("name").is_some_and(|name| !name.as_str().is_some_and(|s| !s.trim().is_empty())) {
            data.set_error_message(
                &ErrorMessage::new("Invalid name", "may not be blank"),
                Some("name"),
                true,
            );
            return Ok(data);
        }

        trimmed_name(&mut data);
        if !validate_parents(&self.ctx, self.entity, &mut data)? {
            return Ok(data);
        }

        data.set_toast_message_value(self.entity.label());
        Ok(data)
    }

    async fn create(&mut self, data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let id = instance_id(&self.ctx)?;

        let mut changes = data.clone().into_inner();
        changes.remove(TOAST_MESSAGE_KEY);

        let updated = self.ctx.records.store().update(self.entity, &id, changes)?;
        Ok(public_record(self.entity, updated))
    }
}

/// Deletes the resolved country, state or city with its dependents
pub struct RegionDelete {
    ctx: HandlerContext,
    entity: Entity,
}

impl RegionDelete {
    pub fn new(ctx: HandlerContext, entity: Entity) -> Self {
        Self { ctx, entity }
    }
}

#[async_trait]
impl Handler for RegionDelete {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        instance_id(&self.ctx)?;
        let mut data = ValidatedData::new(data);
        data.set_toast_message_value(self.entity.label());
        Ok(data)
    }

    async fn create(&mut self, _data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let id = instance_id(&self.ctx)?;
        let summary = self.ctx.records.store().delete(self.entity, &id)?;
        Ok(json!({ "id": id, "deleted": summary }))
    }
}

/// Per-country state and city counts, optionally narrowed by `search`
pub struct RegionSummary {
    ctx: HandlerContext,
}

impl RegionSummary {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for RegionSummary {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        let mut summary = DataMap::new();
        if let Some(search) = data.get("search").and_then(Value::as_str) {
            summary.insert("search".to_string(), Value::String(search.trim().to_lowercase()));
        }
        Ok(ValidatedData::new(summary))
    }

    async fn create(&mut self, data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let store = self.ctx.records.store();
        let search = data.get_str("search").unwrap_or_default();

        let states = store.all(Entity::State)?;
        let cities = store.all(Entity::City)?;

        let mut countries = store.all(Entity::Country)?;
        countries.retain(|country| {
            country
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.to_lowercase().contains(search))
        });
        crate::store::order_by(&mut countries, "name");

        let rows = countries
            .into_iter()
            .map(|country| {
                let id = country.get("id").cloned().unwrap_or(Value::Null);
                let count = |records: &[Record]| {
                    records
                        .iter()
                        .filter(|r| r.get("country").is_some_and(|v| value_matches(v, &id)))
                        .count()
                };
                json!({
                    "id": id,
                    "name": country.get("name").cloned().unwrap_or(Value::Null),
                    "states": count(&states),
                    "cities": count(&cities),
                })
            })
            .collect();

        Ok(Value::Array(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::request::RequestParts;
    use crate::store::RecordStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn data(value: Value) -> DataMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn context(store: &RecordStore, entity: Entity) -> HandlerContext {
        HandlerContext::new(
            Arc::new(RequestParts::default()),
            store.record_set(entity),
            DataMap::new(),
        )
    }

    fn open_store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_country() {
        let (_dir, store) = open_store();
        let mut handler = RegionCreate::new(context(&store, Entity::Country), Entity::Country);

        let mut validated = handler.validate(data(json!({"name": "  India "}))).await.unwrap();
        assert!(validated.error_message().is_none());
        assert_eq!(validated.toast_message_value().as_deref(), Some("Country"));

        let created = handler.create(&mut validated).await.unwrap();
        assert_eq!(created["name"], "India");
        assert_eq!(created["id"], json!(1));
    }

    #[tokio::test]
    async fn test_state_requires_existing_country() {
        let (_dir, store) = open_store();
        let mut handler = RegionCreate::new(context(&store, Entity::State), Entity::State);

        let validated = handler
            .validate(data(json!({"name": "Gujarat", "country": "7"})))
            .await
            .unwrap();

        assert_eq!(validated.error_message().unwrap(), "country does not exist");
    }

    #[tokio::test]
    async fn test_city_state_must_match_country() {
        let (_dir, store) = open_store();
        let india = store.insert(Entity::Country, data(json!({"name": "India"}))).unwrap();
        let nepal = store.insert(Entity::Country, data(json!({"name": "Nepal"}))).unwrap();
        let gujarat = store
            .insert(Entity::State, data(json!({"name": "Gujarat", "country": india["id"]})))
            .unwrap();

        let mut handler = RegionCreate::new(context(&store, Entity::City), Entity::City);
        let validated = handler
            .validate(data(json!({"name": "Surat", "state": gujarat["id"], "country": nepal["id"]})))
            .await
            .unwrap();

        assert_eq!(
            validated.field_errors().unwrap()["state"],
            "state does not belong to the selected country"
        );
    }

    #[tokio::test]
    async fn test_city_update_of_state_alone_checks_stored_country() {
        let (_dir, store) = open_store();
        let india = store.insert(Entity::Country, data(json!({"name": "India"}))).unwrap();
        let nepal = store.insert(Entity::Country, data(json!({"name": "Nepal"}))).unwrap();
        let gujarat = store
            .insert(Entity::State, data(json!({"name": "Gujarat", "country": india["id"]})))
            .unwrap();
        let bagmati = store
            .insert(Entity::State, data(json!({"name": "Bagmati", "country": nepal["id"]})))
            .unwrap();
        let surat = store
            .insert(
                Entity::City,
                data(json!({"name": "Surat", "state": gujarat["id"], "country": india["id"]})),
            )
            .unwrap();

        let ctx = context(&store, Entity::City).with_instance(surat);
        let mut handler = RegionUpdate::new(ctx, Entity::City);
        let validated = handler
            .validate(data(json!({"state": bagmati["id"]})))
            .await
            .unwrap();

        assert_eq!(
            validated.field_errors().unwrap()["state"],
            "state does not belong to the selected country"
        );
    }

    #[tokio::test]
    async fn test_update_requires_a_change() {
        let (_dir, store) = open_store();
        let india = store.insert(Entity::Country, data(json!({"name": "India"}))).unwrap();

        let ctx = context(&store, Entity::Country).with_instance(india);
        let mut handler = RegionUpdate::new(ctx, Entity::Country);
        let validated = handler.validate(data(json!({"id": "1"}))).await.unwrap();

        assert!(validated.error_message().is_some());
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let (_dir, store) = open_store();
        let india = store.insert(Entity::Country, data(json!({"name": "India"}))).unwrap();
        store.insert(Entity::Country, data(json!({"name": "Nepal"}))).unwrap();
        let gujarat = store
            .insert(Entity::State, data(json!({"name": "Gujarat", "country": india["id"]})))
            .unwrap();
        store
            .insert(
                Entity::City,
                data(json!({"name": "Surat", "state": gujarat["id"], "country": india["id"]})),
            )
            .unwrap();

        let mut handler = RegionSummary::new(context(&store, Entity::Country));
        let mut validated = handler.validate(data(json!({"search": "IND"}))).await.unwrap();
        let rows = handler.create(&mut validated).await.unwrap();

        assert_eq!(rows, json!([{"id": 1, "name": "India", "states": 1, "cities": 1}]));
    }
}
