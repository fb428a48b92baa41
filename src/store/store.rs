use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use fjall::{Batch, Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::schema::{check_record, relations_to, Entity, FieldKind, IdKind, OnDelete};

use super::error::{Result, StoreError};
use super::partitions::{encode_record_key, encode_seq_key};
use super::record_set::{value_matches, RecordSet};

/// A persisted row: column name -> JSON value
pub type Record = Map<String, Value>;

/// Fjall-backed record storage, one partition per entity
///
/// Reads go straight to the partitions. Every write path takes the store's
/// write lock so that id allocation, reference checks and uniqueness checks
/// observe a stable view until the write is committed.
#[derive(Clone)]
pub struct RecordStore {
    keyspace: Keyspace,
    /// Indexed by `Entity as usize`, in `Entity::ALL` order
    partitions: Vec<PartitionHandle>,
    metadata: PartitionHandle,
    write_lock: Arc<Mutex<()>>,
}

impl RecordStore {
    /// Open or create a record store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening record store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let mut partitions = Vec::with_capacity(Entity::ALL.len());
        for entity in Entity::ALL {
            partitions.push(
                keyspace.open_partition(entity.table(), PartitionCreateOptions::default())?,
            );
        }
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        info!("Record store opened with {} partitions", partitions.len());
        Ok(Self {
            keyspace,
            partitions,
            metadata,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn partition(&self, entity: Entity) -> &PartitionHandle {
        &self.partitions[entity as usize]
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lazily evaluated view over one entity's records
    pub fn record_set(&self, entity: Entity) -> RecordSet {
        RecordSet::new(self.clone(), entity)
    }

    /// Every record of an entity, in key order
    pub fn all(&self, entity: Entity) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for item in self.partition(entity).iter() {
            let (_, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    /// Get a record by primary key; unparseable keys simply do not match
    pub fn get(&self, entity: Entity, id: &Value) -> Result<Option<Record>> {
        let Some(id) = entity.parse_id(id) else {
            return Ok(None);
        };
        let key = encode_record_key(&id)?;
        match self.partition(entity).get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, entity: Entity, id: &Value) -> Result<bool> {
        Ok(self.get(entity, id)?.is_some())
    }

    /// Insert a single record, returning it with id and timestamps assigned
    pub fn insert(&self, entity: Entity, record: Record) -> Result<Record> {
        let mut write = self.atomic();
        let record = write.insert(entity, record)?;
        write.commit()?;
        Ok(record)
    }

    /// Apply `changes` to an existing record.
    ///
    /// The primary key and `created_at` are immutable; unknown columns are
    /// ignored. `updated_at` is refreshed.
    pub fn update(&self, entity: Entity, id: &Value, changes: Record) -> Result<Record> {
        let _guard = self.lock();

        let mut record = self
            .get(entity, id)?
            .ok_or(StoreError::NotFound {
                entity: entity.label(),
            })?;

        for (field, value) in changes {
            if field == "id" || field == "created_at" || entity.field(&field).is_none() {
                continue;
            }
            record.insert(field, value);
        }
        record.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        self.validate(entity, &mut record, &[])?;

        let key = encode_record_key(record.get("id").unwrap_or(&Value::Null))?;
        self.partition(entity).insert(key, serde_json::to_vec(&record)?)?;
        debug!(entity = entity.table(), "Updated record");
        Ok(record)
    }

    /// Delete a record together with everything that cascades from it.
    ///
    /// Referencing records are removed (`CASCADE`) or have the reference
    /// cleared (`SET NULL`); all changes are committed in one batch.
    pub fn delete(&self, entity: Entity, id: &Value) -> Result<DeleteSummary> {
        let _guard = self.lock();

        let root = self
            .get(entity, id)?
            .ok_or(StoreError::NotFound {
                entity: entity.label(),
            })?;

        let plan = self.plan_delete(entity, root)?;

        let mut batch = self.keyspace.batch();
        let mut summary = DeleteSummary::default();
        for (target, key) in &plan.deleted {
            batch.remove(self.partition(*target), key.clone());
            *summary
                .per_entity
                .entry(target.table().to_string())
                .or_default() += 1;
            summary.total += 1;
        }
        for ((target, key), record) in &plan.nulled {
            batch.insert(self.partition(*target), key.clone(), serde_json::to_vec(record)?);
            summary.nulled += 1;
        }
        batch.commit()?;

        debug!(
            entity = entity.table(),
            deleted = summary.total,
            nulled = summary.nulled,
            "Deleted record"
        );
        Ok(summary)
    }

    fn plan_delete(&self, entity: Entity, root: Record) -> Result<DeletePlan> {
        let mut deleted = BTreeSet::new();
        let mut nulled: BTreeMap<(Entity, Vec<u8>), Record> = BTreeMap::new();
        let mut stack = vec![(entity, root)];

        while let Some((current, record)) = stack.pop() {
            let id = record.get("id").cloned().unwrap_or(Value::Null);
            let key = encode_record_key(&id)?;
            if !deleted.insert((current, key)) {
                continue;
            }

            for relation in relations_to(current) {
                for candidate in self.all(relation.from)? {
                    let references = candidate
                        .get(relation.field)
                        .is_some_and(|value| value_matches(value, &id));
                    if !references {
                        continue;
                    }

                    match relation.on_delete {
                        OnDelete::Cascade => stack.push((relation.from, candidate)),
                        OnDelete::SetNull => {
                            let candidate_key =
                                encode_record_key(candidate.get("id").unwrap_or(&Value::Null))?;
                            nulled
                                .entry((relation.from, candidate_key))
                                .or_insert(candidate)
                                .insert(relation.field.to_string(), Value::Null);
                        }
                    }
                }
            }
        }

        nulled.retain(|target, _| !deleted.contains(target));
        Ok(DeletePlan { deleted, nulled })
    }

    /// Start an atomic multi-record write
    ///
    /// Holds the write lock until committed or dropped; dropping without
    /// `commit` discards every staged record.
    pub fn atomic(&self) -> AtomicWrite<'_> {
        AtomicWrite {
            store: self,
            _guard: self.lock(),
            batch: self.keyspace.batch(),
            pending: Vec::new(),
        }
    }

    fn prepare_insert(
        &self,
        entity: Entity,
        record: Record,
        pending: &[(Entity, Record)],
    ) -> Result<Record> {
        let mut prepared = Record::new();
        for spec in entity.fields() {
            let value = record.get(spec.name).cloned().unwrap_or(Value::Null);
            prepared.insert(spec.name.to_string(), value);
        }

        let now = Value::String(Utc::now().to_rfc3339());
        for field in ["created_at", "updated_at"] {
            if prepared.get(field).is_none_or(Value::is_null) {
                prepared.insert(field.to_string(), now.clone());
            }
        }

        self.validate(entity, &mut prepared, pending)?;

        let id = match entity.id_kind() {
            IdKind::Auto => {
                let staged = pending.iter().filter(|(e, _)| *e == entity).count() as u64;
                Value::from(self.current_id(entity)? + staged + 1)
            }
            IdKind::Uuid => Value::String(Uuid::new_v4().to_string()),
        };
        prepared.insert("id".to_string(), id);
        Ok(prepared)
    }

    /// Column constraints, reference integrity and uniqueness
    fn validate(
        &self,
        entity: Entity,
        record: &mut Record,
        pending: &[(Entity, Record)],
    ) -> Result<()> {
        check_record(entity, record)?;

        let own_id = record.get("id").cloned().unwrap_or(Value::Null);

        for spec in entity.fields() {
            if let FieldKind::ForeignKey { to, .. } = spec.kind {
                let value = record.get(spec.name).cloned().unwrap_or(Value::Null);
                if !value.is_null() {
                    let id = to
                        .parse_id(&value)
                        .ok_or_else(|| StoreError::InvalidKey(value.to_string()))?;

                    let staged = pending
                        .iter()
                        .any(|(e, r)| *e == to && r.get("id") == Some(&id));
                    if !staged && !self.exists(to, &id)? {
                        return Err(StoreError::MissingReference {
                            entity: entity.label(),
                            field: spec.name.to_string(),
                            target: to.label(),
                            id: match &id {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            },
                        });
                    }
                    record.insert(spec.name.to_string(), id);
                }
            }

            if spec.unique {
                let value = record.get(spec.name).cloned().unwrap_or(Value::Null);
                if value.is_null() {
                    continue;
                }

                let stored = self.all(entity)?;
                let staged = pending
                    .iter()
                    .filter(|(e, _)| *e == entity)
                    .map(|(_, r)| r);
                let conflict = stored.iter().chain(staged).any(|other| {
                    other.get("id") != Some(&own_id)
                        && other
                            .get(spec.name)
                            .is_some_and(|existing| value_matches(existing, &value))
                });
                if conflict {
                    return Err(StoreError::UniqueViolation {
                        entity: entity.label(),
                        field: spec.name.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Last committed integer id; read under the write lock
    fn current_id(&self, entity: Entity) -> Result<u64> {
        let key = encode_seq_key(entity.table());
        match self.metadata.get(&key)? {
            Some(value) => std::str::from_utf8(&value)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| StoreError::InvalidKey(String::from_utf8_lossy(&value).into_owned())),
            None => Ok(0),
        }
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Record counts per table (for health reporting)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut records = BTreeMap::new();
        for entity in Entity::ALL {
            let mut count = 0;
            for item in self.partition(entity).iter() {
                item?;
                count += 1;
            }
            records.insert(entity.table().to_string(), count);
        }
        Ok(StoreStats { records })
    }
}

/// Staged inserts committed as one fjall batch
pub struct AtomicWrite<'a> {
    store: &'a RecordStore,
    _guard: MutexGuard<'a, ()>,
    batch: Batch,
    pending: Vec<(Entity, Record)>,
}

impl AtomicWrite<'_> {
    /// Stage an insert. Later inserts in the same write may reference it.
    pub fn insert(&mut self, entity: Entity, record: Record) -> Result<Record> {
        let record = self.store.prepare_insert(entity, record, &self.pending)?;
        let key = encode_record_key(record.get("id").unwrap_or(&Value::Null))?;
        self.batch
            .insert(self.store.partition(entity), key, serde_json::to_vec(&record)?);
        self.pending.push((entity, record.clone()));
        Ok(record)
    }

    /// Commit staged records together with the sequence bumps they consumed
    pub fn commit(mut self) -> Result<()> {
        let mut sequences: BTreeMap<Entity, u64> = BTreeMap::new();
        for (entity, record) in &self.pending {
            if let Some(id) = record.get("id").and_then(Value::as_u64) {
                let last = sequences.entry(*entity).or_default();
                *last = (*last).max(id);
            }
        }
        for (entity, last) in sequences {
            self.batch.insert(
                &self.store.metadata,
                encode_seq_key(entity.table()),
                last.to_string().into_bytes(),
            );
        }

        let staged = self.pending.len();
        self.batch.commit()?;
        debug!(records = staged, "Committed atomic write");
        Ok(())
    }
}

struct DeletePlan {
    deleted: BTreeSet<(Entity, Vec<u8>)>,
    nulled: BTreeMap<(Entity, Vec<u8>), Record>,
}

/// Outcome of a cascading delete
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteSummary {
    pub total: usize,
    pub per_entity: BTreeMap<String, usize>,
    /// Records whose reference was cleared instead of deleted
    pub nulled: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub records: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("db")).unwrap();
        (dir, store)
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let (_dir, store) = open_store();

        let first = store
            .insert(Entity::Country, record(json!({"name": "India"})))
            .unwrap();
        let second = store
            .insert(Entity::Country, record(json!({"name": "Nepal"})))
            .unwrap();

        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert!(first["created_at"].is_string());
        assert!(first["created_by"].is_null());
    }

    #[test]
    fn test_missing_reference_rejected() {
        let (_dir, store) = open_store();

        let err = store
            .insert(Entity::State, record(json!({"name": "Bagmati", "country": 99})))
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { .. }));
        assert!(store.all(Entity::State).unwrap().is_empty());
    }

    #[test]
    fn test_delete_cascades_to_states_and_cities() {
        let (_dir, store) = open_store();

        let country = store
            .insert(Entity::Country, record(json!({"name": "India"})))
            .unwrap();
        let other = store
            .insert(Entity::Country, record(json!({"name": "Nepal"})))
            .unwrap();
        let state = store
            .insert(
                Entity::State,
                record(json!({"name": "Gujarat", "country": country["id"]})),
            )
            .unwrap();
        store
            .insert(
                Entity::City,
                record(json!({"name": "Surat", "state": state["id"], "country": country["id"]})),
            )
            .unwrap();

        let summary = store.delete(Entity::Country, &country["id"]).unwrap();

        assert_eq!(summary.total, 3);
        assert!(store.all(Entity::State).unwrap().is_empty());
        assert!(store.all(Entity::City).unwrap().is_empty());
        assert!(store.exists(Entity::Country, &other["id"]).unwrap());
    }

    #[test]
    fn test_atomic_write_discarded_on_drop() {
        let (_dir, store) = open_store();

        {
            let mut write = store.atomic();
            write
                .insert(Entity::Country, record(json!({"name": "India"})))
                .unwrap();
        }

        assert!(store.all(Entity::Country).unwrap().is_empty());
    }

    #[test]
    fn test_rejected_writes_do_not_consume_ids() {
        let (_dir, store) = open_store();

        {
            let mut write = store.atomic();
            write
                .insert(Entity::Country, record(json!({"name": "India"})))
                .unwrap();
        }
        store
            .insert(Entity::State, record(json!({"name": "Bagmati", "country": 99})))
            .unwrap_err();

        let country = store
            .insert(Entity::Country, record(json!({"name": "Nepal"})))
            .unwrap();
        let state = store
            .insert(Entity::State, record(json!({"name": "Bagmati", "country": country["id"]})))
            .unwrap();
        assert_eq!(country["id"], json!(1));
        assert_eq!(state["id"], json!(1));
    }

    #[test]
    fn test_atomic_write_allocates_consecutive_ids() {
        let (_dir, store) = open_store();

        let mut write = store.atomic();
        let first = write
            .insert(Entity::Country, record(json!({"name": "India"})))
            .unwrap();
        let second = write
            .insert(Entity::Country, record(json!({"name": "Nepal"})))
            .unwrap();
        write.commit().unwrap();

        let third = store
            .insert(Entity::Country, record(json!({"name": "Bhutan"})))
            .unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert_eq!(third["id"], json!(3));
    }

    #[test]
    fn test_update_refreshes_timestamp_and_keeps_id() {
        let (_dir, store) = open_store();

        let country = store
            .insert(Entity::Country, record(json!({"name": "Indai"})))
            .unwrap();
        let updated = store
            .update(
                Entity::Country,
                &json!("1"),
                record(json!({"id": 5, "name": "India"})),
            )
            .unwrap();

        assert_eq!(updated["id"], country["id"]);
        assert_eq!(updated["name"], "India");
        assert_eq!(updated["created_at"], country["created_at"]);
    }

    #[test]
    fn test_stats_counts_records() {
        let (_dir, store) = open_store();
        store
            .insert(Entity::Country, record(json!({"name": "India"})))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.records["country"], 1);
        assert_eq!(stats.records["city"], 0);
    }
}
