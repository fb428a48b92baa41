//! Typed views over stored records

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::enums::UserRole;
use super::error::ModelError;
use super::schema::Entity;
use crate::store::Record;

/// Conversion between a typed model and its stored record
pub trait Model: Serialize + DeserializeOwned {
    const ENTITY: Entity;

    fn to_record(&self) -> Result<Record, ModelError> {
        let value = serde_json::to_value(self).map_err(|source| ModelError::Decode {
            entity: Self::ENTITY.label(),
            source,
        })?;
        match value {
            Value::Object(record) => Ok(record),
            _ => Err(ModelError::Invalid(format!(
                "{} did not serialize to an object",
                Self::ENTITY.label()
            ))),
        }
    }

    fn from_record(record: Record) -> Result<Self, ModelError> {
        serde_json::from_value(Value::Object(record)).map_err(|source| ModelError::Decode {
            entity: Self::ENTITY.label(),
            source,
        })
    }
}

/// Columns shared by every entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditColumns {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<u64>,
    #[serde(default)]
    pub updated_by: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(flatten)]
    pub audit: AuditColumns,
}

impl Model for Country {
    const ENTITY: Entity = Entity::Country;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub country: u64,
    #[serde(flatten)]
    pub audit: AuditColumns,
}

impl Model for State {
    const ENTITY: Entity = Entity::State;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub state: u64,
    pub country: u64,
    #[serde(flatten)]
    pub audit: AuditColumns,
}

impl Model for City {
    const ENTITY: Entity = Entity::City;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    pub role: UserRole,
    #[serde(flatten)]
    pub audit: AuditColumns,
}

impl Model for UserRoleRecord {
    const ENTITY: Entity = Entity::UserRole;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub user_role: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    /// Encoded hash, never the raw password
    pub password: String,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditColumns,
}

impl Model for User {
    const ENTITY: Entity = Entity::User;
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub user: Option<Uuid>,
    #[serde(default)]
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: Option<u64>,
    #[serde(default)]
    pub state: Option<u64>,
    #[serde(default)]
    pub country: Option<u64>,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub emergency_contact_number: Option<String>,
    #[serde(flatten)]
    pub audit: AuditColumns,
}

impl Model for UserDetail {
    const ENTITY: Entity = Entity::UserDetail;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistedToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user: Uuid,
    pub token: String,
    #[serde(default)]
    pub is_login: bool,
    #[serde(default)]
    pub is_delete: bool,
    #[serde(flatten)]
    pub audit: AuditColumns,
}

impl Model for BlacklistedToken {
    const ENTITY: Entity = Entity::BlacklistedToken;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_country_record_shape() {
        let country = Country {
            id: None,
            name: "India".to_string(),
            audit: AuditColumns::default(),
        };

        let record = country.to_record().unwrap();
        assert!(!record.contains_key("id"));
        assert_eq!(record["name"], "India");
        assert!(record["created_at"].is_null());
        assert!(record["updated_by"].is_null());
    }

    #[test]
    fn test_user_from_stored_record() {
        let record = json!({
            "id": "6f1c2f9a-7a51-4a8e-9a3e-0a8c1f8b8e11",
            "username": null,
            "first_name": "",
            "last_name": "",
            "email": "a@x.com",
            "phone_number": null,
            "user_role": null,
            "is_active": true,
            "is_staff": false,
            "is_superuser": false,
            "password": "sha256$salt$digest",
            "last_login": null,
            "created_at": "2024-05-01T10:00:00+00:00",
            "updated_at": "2024-05-01T10:00:00+00:00",
            "created_by": null,
            "updated_by": null
        });

        let Value::Object(record) = record else {
            unreachable!()
        };
        let user = User::from_record(record).unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(user.audit.created_at.is_some());
        assert!(user.id.is_some());
    }

    #[test]
    fn test_role_record_rejects_unknown_role() {
        let Value::Object(record) = json!({"role": "OWNER"}) else {
            unreachable!()
        };
        assert!(matches!(
            UserRoleRecord::from_record(record),
            Err(ModelError::Decode { .. })
        ));
    }
}
