//! User and role handlers

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use super::traits::{Handler, HandlerError};
use super::types::{required_field_validation, DataMap, ErrorMessage, HandlerContext, ValidatedData};
use crate::models::schema::public_record;
use crate::models::{
    normalize_email, AuditColumns, Choices, Entity, Model, NewUser, UserDetail, UserManager,
    UserRole, UserRoleRecord,
};
use crate::store::value_matches;

const USER_REQUIRED: &[(&str, &str)] = &[
    ("email", "Email is required"),
    ("password", "Password is required"),
];

const ROLE_REQUIRED: &[(&str, &str)] = &[("role", "Role is required")];

fn optional_string(data: &ValidatedData, key: &str) -> Option<String> {
    data.get_str(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn optional_id(data: &ValidatedData, entity: Entity, key: &str) -> Option<u64> {
    data.get(key)
        .and_then(|value| entity.parse_id(value))
        .and_then(|value| value.as_u64())
}

/// Registers a user together with its detail record
pub struct UserCreate {
    ctx: HandlerContext,
}

impl UserCreate {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for UserCreate {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        let mut data = ValidatedData::new(data);

        if let Some(missing) = required_field_validation(data.as_map(), USER_REQUIRED) {
            data.set_missing_field(&missing);
            return Ok(data);
        }

        let email = data.get_str("email").map(normalize_email).unwrap_or_default();
        if !email.contains('@') {
            data.set_error_message(
                &ErrorMessage::new("Invalid email", "Enter a valid email address."),
                Some("email"),
                true,
            );
            return Ok(data);
        }

        let taken = self
            .ctx
            .records
            .store()
            .all(Entity::User)?
            .iter()
            .any(|user| user.get("email").and_then(Value::as_str) == Some(email.as_str()));
        if taken {
            data.set_error_message(
                &ErrorMessage::new("Email already registered", "is already registered"),
                Some("email"),
                true,
            );
            return Ok(data);
        }
        data.insert("email", Value::String(email));

        if let Some(role) = data.get("user_role").filter(|value| !value.is_null()).cloned() {
            let exists = match Entity::UserRole.parse_id(&role) {
                Some(id) => self.ctx.records.store().exists(Entity::UserRole, &id)?,
                None => false,
            };
            if !exists {
                data.set_error_message(
                    &ErrorMessage::new("Invalid role", "does not exist"),
                    Some("user_role"),
                    true,
                );
                return Ok(data);
            }
        }

        data.set_toast_message_value("User");
        Ok(data)
    }

    async fn create(&mut self, data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let new_user = NewUser {
            email: data.get_str("email").unwrap_or_default().to_string(),
            password: data.get_str("password").unwrap_or_default().to_string(),
            username: optional_string(data, "username"),
            first_name: optional_string(data, "first_name").unwrap_or_default(),
            last_name: optional_string(data, "last_name").unwrap_or_default(),
            phone_number: optional_string(data, "phone_number"),
            user_role: data
                .get_str("user_role")
                .and_then(|id| Uuid::parse_str(id.trim()).ok()),
        };

        let detail = UserDetail {
            profile_photo: optional_string(data, "profile_photo"),
            address: optional_string(data, "address").unwrap_or_default(),
            city: optional_id(data, Entity::City, "city"),
            state: optional_id(data, Entity::State, "state"),
            country: optional_id(data, Entity::Country, "country"),
            postal_code: optional_string(data, "postal_code").unwrap_or_default(),
            emergency_contact_number: optional_string(data, "emergency_contact_number"),
            ..Default::default()
        };

        let manager = UserManager::new(self.ctx.records.store());
        let (user, detail) = manager.create_user(new_user, detail)?;

        Ok(json!({
            "user": public_record(Entity::User, user),
            "detail": public_record(Entity::UserDetail, detail),
        }))
    }
}

/// Deletes the resolved user; detail and tokens cascade
pub struct UserDelete {
    ctx: HandlerContext,
}

impl UserDelete {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    fn user_id(&self) -> Result<Value, HandlerError> {
        self.ctx
            .instance
            .as_ref()
            .and_then(|user| user.get("id").cloned())
            .ok_or_else(|| HandlerError::Fatal("instance was not resolved".to_string()))
    }
}

#[async_trait]
impl Handler for UserDelete {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        let is_superuser = self
            .ctx
            .instance
            .as_ref()
            .and_then(|user| user.get("is_superuser"))
            .is_some_and(|flag| value_matches(flag, &Value::Bool(true)));

        let mut data = ValidatedData::new(data);
        if is_superuser {
            data.set_error_message(
                &ErrorMessage::new("Not allowed", "Superusers cannot be deleted through the API"),
                None,
                false,
            );
            return Ok(data);
        }

        data.set_toast_message_value("User");
        Ok(data)
    }

    async fn create(&mut self, _data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let id = self.user_id()?;
        let summary = self.ctx.records.store().delete(Entity::User, &id)?;
        Ok(json!({ "id": id, "deleted": summary }))
    }
}

/// Creates a role from the fixed role enumeration
pub struct RoleCreate {
    ctx: HandlerContext,
}

impl RoleCreate {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for RoleCreate {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        let mut data = ValidatedData::new(data);

        if let Some(missing) = required_field_validation(data.as_map(), ROLE_REQUIRED) {
            data.set_missing_field(&missing);
            return Ok(data);
        }

        let role = data.get_str("role").unwrap_or_default().trim().to_uppercase();
        if UserRole::from_value(&role).is_none() {
            let allowed: Vec<&str> = UserRole::ALL.iter().map(|role| role.value()).collect();
            data.set_error_message(
                &ErrorMessage::new(
                    "Invalid role",
                    format!("must be one of {}", allowed.join(", ")),
                ),
                Some("role"),
                true,
            );
            return Ok(data);
        }
        data.insert("role", Value::String(role));

        data.set_toast_message_value("Role");
        Ok(data)
    }

    async fn create(&mut self, data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let role: UserRole = data.get_str("role").unwrap_or_default().parse()?;
        let record = UserRoleRecord {
            id: None,
            title: optional_string(data, "title"),
            role,
            audit: AuditColumns::default(),
        }
        .to_record()?;

        let created = self.ctx.records.store().insert(Entity::UserRole, record)?;
        Ok(public_record(Entity::UserRole, created))
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

    fn open_store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("db")).unwrap();
        (dir, store)
    }

    fn context(store: &RecordStore, entity: Entity) -> HandlerContext {
        HandlerContext::new(
            Arc::new(RequestParts::default()),
            store.record_set(entity),
            DataMap::new(),
        )
    }

    #[tokio::test]
    async fn test_missing_password_reported() {
        let (_dir, store) = open_store();
        let mut handler = UserCreate::new(context(&store, Entity::User));

        let validated = handler.validate(data(json!({"email": "a@x.com"}))).await.unwrap();

        assert!(validated.error_message().is_some());
        assert!(validated.field_errors().unwrap().get("password").is_some());
    }

    #[tokio::test]
    async fn test_create_user_hides_password() {
        let (_dir, store) = open_store();
        let mut handler = UserCreate::new(context(&store, Entity::User));

        let mut validated = handler
            .validate(data(json!({"email": "A@X.COM", "password": "secret123", "postal_code": "380001"})))
            .await
            .unwrap();
        assert!(validated.error_message().is_none());

        let created = handler.create(&mut validated).await.unwrap();
        assert_eq!(created["user"]["email"], "A@x.com");
        assert!(created["user"].get("password").is_none());
        assert_eq!(created["detail"]["postal_code"], "380001");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_field_error() {
        let (_dir, store) = open_store();
        UserManager::new(&store)
            .create_user(
                NewUser {
                    email: "a@x.com".to_string(),
                    password: "pw".to_string(),
                    ..Default::default()
                },
                UserDetail::default(),
            )
            .unwrap();

        let mut handler = UserCreate::new(context(&store, Entity::User));
        let validated = handler
            .validate(data(json!({"email": "a@x.com", "password": "pw"})))
            .await
            .unwrap();

        assert_eq!(validated.error_message().unwrap(), "email is already registered");
    }

    #[tokio::test]
    async fn test_role_must_be_a_choice() {
        let (_dir, store) = open_store();
        let mut handler = RoleCreate::new(context(&store, Entity::UserRole));

        let validated = handler.validate(data(json!({"role": "owner"}))).await.unwrap();
        assert_eq!(
            validated.error_message().unwrap(),
            "role must be one of ADMIN, TENANT, MANAGER"
        );

        let mut validated = handler.validate(data(json!({"role": "tenant"}))).await.unwrap();
        let created = handler.create(&mut validated).await.unwrap();
        assert_eq!(created["role"], "TENANT");
    }
}
