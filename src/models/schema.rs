//! Declarative schema registry.
//!
//! Every persisted entity is described here once: its fields, their
//! constraints and the foreign keys between entities. The record store uses
//! the relations to plan cascading deletes, handlers use [`check_record`] to
//! enforce column constraints, and `makemigrations` renders the same
//! description as SQL DDL per app.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Persisted entity types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Country,
    State,
    City,
    UserRole,
    User,
    UserDetail,
    BlacklistedToken,
}

/// How primary keys are allocated for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Monotonic integer sequence
    Auto,
    /// Random UUIDv4
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    AutoId,
    UuidId,
    Char(usize),
    Text,
    Boolean,
    Timestamp,
    ForeignKey { to: Entity, on_delete: OnDelete },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
    /// Stored but never rendered in API payloads
    pub write_only: bool,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            unique: false,
            write_only: false,
        }
    }

    fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self.kind, FieldKind::AutoId | FieldKind::UuidId)
    }

    pub fn column_name(&self) -> String {
        match self.kind {
            FieldKind::ForeignKey { .. } => format!("{}_id", self.name),
            _ => self.name.to_string(),
        }
    }
}

/// A foreign key edge: `from.field` references `to.id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub from: Entity,
    pub field: &'static str,
    pub to: Entity,
    pub on_delete: OnDelete,
}

/// Column constraint violated by a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn fk(name: &'static str, to: Entity, on_delete: OnDelete) -> FieldSpec {
    FieldSpec::new(name, FieldKind::ForeignKey { to, on_delete })
}

/// Audit columns carried by every entity
fn audit_fields() -> [FieldSpec; 4] {
    [
        FieldSpec::new("created_at", FieldKind::Timestamp).nullable(),
        FieldSpec::new("updated_at", FieldKind::Timestamp).nullable(),
        fk("created_by", Entity::UserDetail, OnDelete::SetNull).nullable(),
        fk("updated_by", Entity::UserDetail, OnDelete::SetNull).nullable(),
    ]
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Country,
        Entity::State,
        Entity::City,
        Entity::UserRole,
        Entity::User,
        Entity::UserDetail,
        Entity::BlacklistedToken,
    ];

    /// Table name, also used as the store partition name
    pub fn table(self) -> &'static str {
        match self {
            Entity::Country => "country",
            Entity::State => "state",
            Entity::City => "city",
            Entity::UserRole => "user_role",
            Entity::User => "user",
            Entity::UserDetail => "user_detail",
            Entity::BlacklistedToken => "blacklisted_token",
        }
    }

    /// Human readable name used in messages
    pub fn label(self) -> &'static str {
        match self {
            Entity::Country => "Country",
            Entity::State => "State",
            Entity::City => "City",
            Entity::UserRole => "User role",
            Entity::User => "User",
            Entity::UserDetail => "User detail",
            Entity::BlacklistedToken => "Blacklisted token",
        }
    }

    pub fn id_kind(self) -> IdKind {
        match self {
            Entity::Country | Entity::State | Entity::City | Entity::UserDetail => {
                IdKind::Auto
            }
            Entity::UserRole | Entity::User | Entity::BlacklistedToken => IdKind::Uuid,
        }
    }

    pub fn fields(self) -> Vec<FieldSpec> {
        use FieldKind::{AutoId, Boolean, Char, Text, Timestamp, UuidId};

        let mut fields = match self {
            Entity::Country => vec![
                FieldSpec::new("id", AutoId),
                FieldSpec::new("name", Char(100)),
            ],
            Entity::State => vec![
                FieldSpec::new("id", AutoId),
                FieldSpec::new("name", Char(100)),
                fk("country", Entity::Country, OnDelete::Cascade),
            ],
            Entity::City => vec![
                FieldSpec::new("id", AutoId),
                FieldSpec::new("name", Char(100)),
                fk("state", Entity::State, OnDelete::Cascade),
                fk("country", Entity::Country, OnDelete::Cascade),
            ],
            Entity::UserRole => vec![
                FieldSpec::new("id", UuidId),
                FieldSpec::new("title", Char(100)).nullable(),
                FieldSpec::new("role", Char(50)),
            ],
            Entity::User => vec![
                FieldSpec::new("id", UuidId),
                FieldSpec::new("username", Char(100)).nullable(),
                FieldSpec::new("first_name", Char(50)),
                FieldSpec::new("last_name", Char(50)),
                FieldSpec::new("email", Char(100)).unique(),
                FieldSpec::new("phone_number", Char(15)).nullable(),
                fk("user_role", Entity::UserRole, OnDelete::Cascade).nullable(),
                FieldSpec::new("is_active", Boolean),
                FieldSpec::new("is_staff", Boolean),
                FieldSpec::new("is_superuser", Boolean),
                FieldSpec::new("password", Char(128)).write_only(),
                FieldSpec::new("last_login", Timestamp).nullable(),
            ],
            Entity::UserDetail => vec![
                FieldSpec::new("id", AutoId),
                fk("user", Entity::User, OnDelete::Cascade).unique(),
                FieldSpec::new("profile_photo", Char(100)).nullable(),
                FieldSpec::new("address", Char(255)),
                fk("city", Entity::City, OnDelete::SetNull).nullable(),
                fk("state", Entity::State, OnDelete::SetNull).nullable(),
                fk("country", Entity::Country, OnDelete::SetNull).nullable(),
                FieldSpec::new("postal_code", Char(10)),
                FieldSpec::new("emergency_contact_number", Char(15)).nullable(),
            ],
            Entity::BlacklistedToken => vec![
                FieldSpec::new("id", UuidId),
                fk("user", Entity::User, OnDelete::Cascade),
                FieldSpec::new("token", Text),
                FieldSpec::new("is_login", Boolean),
                FieldSpec::new("is_delete", Boolean),
            ],
        };

        fields.extend(audit_fields());
        fields
    }

    pub fn field(self, name: &str) -> Option<FieldSpec> {
        self.fields().into_iter().find(|spec| spec.name == name)
    }

    /// Normalize a primary key value for this entity.
    ///
    /// Integer ids accept JSON numbers and numeric strings (query strings and
    /// path segments always arrive as text); UUID ids accept any string that
    /// parses as a UUID.
    pub fn parse_id(self, value: &Value) -> Option<Value> {
        match self.id_kind() {
            IdKind::Auto => match value {
                Value::Number(n) => n.as_u64().map(Value::from),
                Value::String(s) => s.trim().parse::<u64>().ok().map(Value::from),
                _ => None,
            },
            IdKind::Uuid => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .map(|id| Value::String(id.to_string())),
        }
    }
}

/// All foreign keys pointing at `target`
pub fn relations_to(target: Entity) -> Vec<Relation> {
    Entity::ALL
        .iter()
        .flat_map(|&from| {
            from.fields().into_iter().filter_map(move |spec| match spec.kind {
                FieldKind::ForeignKey { to, on_delete } if to == target => Some(Relation {
                    from,
                    field: spec.name,
                    to,
                    on_delete,
                }),
                _ => None,
            })
        })
        .collect()
}

/// Check a full record against the entity's column constraints.
///
/// Primary keys are skipped since the store assigns them.
pub fn check_record(entity: Entity, record: &Map<String, Value>) -> Result<(), FieldViolation> {
    for spec in entity.fields() {
        if spec.is_primary_key() {
            continue;
        }

        let value = record.get(spec.name).unwrap_or(&Value::Null);
        if value.is_null() {
            if spec.nullable {
                continue;
            }
            return Err(FieldViolation::new(spec.name, "This field may not be null."));
        }

        match spec.kind {
            FieldKind::Char(max) => match value.as_str() {
                Some(text) if text.chars().count() > max => {
                    return Err(FieldViolation::new(
                        spec.name,
                        format!("Ensure this field has no more than {max} characters."),
                    ));
                }
                Some(_) => {}
                None => return Err(FieldViolation::new(spec.name, "Not a valid string.")),
            },
            FieldKind::Text => {
                if !value.is_string() {
                    return Err(FieldViolation::new(spec.name, "Not a valid string."));
                }
            }
            FieldKind::Boolean => {
                if !value.is_boolean() {
                    return Err(FieldViolation::new(spec.name, "Must be a valid boolean."));
                }
            }
            FieldKind::Timestamp => {
                let valid = value
                    .as_str()
                    .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok());
                if !valid {
                    return Err(FieldViolation::new(spec.name, "Datetime has wrong format."));
                }
            }
            FieldKind::ForeignKey { to, .. } => {
                if to.parse_id(value).is_none() {
                    return Err(FieldViolation::new(
                        spec.name,
                        "Incorrect type. Expected pk value.",
                    ));
                }
            }
            FieldKind::AutoId | FieldKind::UuidId => {}
        }
    }

    Ok(())
}

/// Render a record for API output, dropping write-only columns
pub fn public_record(entity: Entity, mut record: Map<String, Value>) -> Value {
    for spec in entity.fields() {
        if spec.write_only {
            record.remove(spec.name);
        }
    }
    Value::Object(record)
}

/// An installable app and the entities it owns
#[derive(Debug, Clone, Copy)]
pub struct AppSpec {
    pub label: &'static str,
    /// Dotted module path, mapped to directories when writing migrations
    pub path: &'static str,
    pub entities: &'static [Entity],
}

pub const APPS: &[AppSpec] = &[
    AppSpec {
        label: "core_utils",
        path: "core_utils",
        entities: &[],
    },
    AppSpec {
        label: "region_data",
        path: "core_utils.region_data",
        entities: &[Entity::Country, Entity::State, Entity::City],
    },
    AppSpec {
        label: "user_auth",
        path: "user_config.user_auth",
        entities: &[Entity::UserRole, Entity::User, Entity::UserDetail],
    },
    AppSpec {
        label: "accounts",
        path: "user_config.accounts",
        entities: &[Entity::BlacklistedToken],
    },
];

pub fn find_app(label: &str) -> Option<&'static AppSpec> {
    APPS.iter().find(|app| app.label == label)
}

impl AppSpec {
    /// DDL for every table the app owns, `None` when it owns no tables
    pub fn migration_sql(&self) -> Option<String> {
        if self.entities.is_empty() {
            return None;
        }

        let mut sql = format!("-- Schema for app '{}'\n", self.label);
        for entity in self.entities {
            sql.push('\n');
            sql.push_str(&create_table_sql(*entity));
        }
        Some(sql)
    }
}

pub fn create_table_sql(entity: Entity) -> String {
    let columns: Vec<String> = entity.fields().iter().map(column_sql).collect();
    format!(
        "CREATE TABLE \"{}\" (\n    {}\n);\n",
        entity.table(),
        columns.join(",\n    ")
    )
}

fn column_sql(spec: &FieldSpec) -> String {
    let sql_type = match spec.kind {
        FieldKind::AutoId => "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY".to_string(),
        FieldKind::UuidId => "UUID PRIMARY KEY".to_string(),
        FieldKind::Char(max) => format!("VARCHAR({max})"),
        FieldKind::Text => "TEXT".to_string(),
        FieldKind::Boolean => "BOOLEAN".to_string(),
        FieldKind::Timestamp => "TIMESTAMP WITH TIME ZONE".to_string(),
        FieldKind::ForeignKey { to, .. } => match to.id_kind() {
            IdKind::Auto => "BIGINT".to_string(),
            IdKind::Uuid => "UUID".to_string(),
        },
    };

    let mut column = format!("\"{}\" {}", spec.column_name(), sql_type);
    if !spec.is_primary_key() {
        if !spec.nullable {
            column.push_str(" NOT NULL");
        }
        if spec.unique {
            column.push_str(" UNIQUE");
        }
    }

    if let FieldKind::ForeignKey { to, on_delete } = spec.kind {
        let action = match on_delete {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        };
        column.push_str(&format!(
            " REFERENCES \"{}\" (\"id\") ON DELETE {action}",
            to.table()
        ));
    }

    column
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn relations_to_country_cascade_and_set_null() {
        let relations = relations_to(Entity::Country);

        assert!(relations.contains(&Relation {
            from: Entity::State,
            field: "country",
            to: Entity::Country,
            on_delete: OnDelete::Cascade,
        }));
        assert!(relations.contains(&Relation {
            from: Entity::City,
            field: "country",
            to: Entity::Country,
            on_delete: OnDelete::Cascade,
        }));
        assert!(relations.contains(&Relation {
            from: Entity::UserDetail,
            field: "country",
            to: Entity::Country,
            on_delete: OnDelete::SetNull,
        }));
    }

    #[test]
    fn audit_columns_reference_user_detail_for_every_entity() {
        let relations = relations_to(Entity::UserDetail);
        for entity in Entity::ALL {
            assert!(relations.iter().any(|r| r.from == entity
                && r.field == "created_by"
                && r.on_delete == OnDelete::SetNull));
        }
    }

    #[test]
    fn parse_id_coerces_numeric_strings() {
        assert_eq!(Entity::Country.parse_id(&json!("42")), Some(json!(42)));
        assert_eq!(Entity::Country.parse_id(&json!(7)), Some(json!(7)));
        assert_eq!(Entity::Country.parse_id(&json!("abc")), None);
        assert_eq!(Entity::User.parse_id(&json!(7)), None);
    }

    #[test]
    fn check_record_enforces_max_length() {
        let record = as_map(json!({
            "user": "6f1c2f9a-7a51-4a8e-9a3e-0a8c1f8b8e11",
            "address": "1 Main St",
            "postal_code": "12345678901",
        }));

        let err = check_record(Entity::UserDetail, &record).unwrap_err();
        assert_eq!(err.field, "postal_code");
    }

    #[test]
    fn check_record_rejects_missing_required_column() {
        let record = as_map(json!({ "name": "Gujarat" }));
        let err = check_record(Entity::State, &record).unwrap_err();
        assert_eq!(err.field, "country");
    }

    #[test]
    fn public_record_hides_password() {
        let record = as_map(json!({ "email": "a@x.com", "password": "secret" }));
        let rendered = public_record(Entity::User, record);
        assert!(rendered.get("password").is_none());
        assert_eq!(rendered["email"], "a@x.com");
    }

    #[test]
    fn app_without_entities_has_no_migration() {
        assert!(find_app("core_utils").unwrap().migration_sql().is_none());
        let sql = find_app("region_data").unwrap().migration_sql().unwrap();
        assert!(sql.contains("CREATE TABLE \"city\""));
        assert!(sql.contains("\"state_id\" BIGINT NOT NULL REFERENCES \"state\" (\"id\") ON DELETE CASCADE"));
    }
}
