use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::traits::{Handler, HandlerError, ValidationError};
use super::types::{required_field_validation, DataMap, ErrorMessage, HandlerContext, ValidatedData};
use crate::models::schema::public_record;
use crate::models::{AuditColumns, BlacklistedToken, Entity, Model};
use crate::store::value_matches;

const REQUIRED: &[(&str, &str)] = &[
    ("user", "User is required"),
    ("token", "Token is required"),
];

/// Accepts JSON booleans as well as the text forms forms send
fn flag(data: &ValidatedData, key: &str) -> bool {
    match data.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_u64() == Some(1),
        _ => false,
    }
}

/// Records a revoked token for a user
pub struct TokenBlacklist {
    ctx: HandlerContext,
}

impl TokenBlacklist {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for TokenBlacklist {
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError> {
        let mut data = ValidatedData::new(data);

        if let Some(missing) = required_field_validation(data.as_map(), REQUIRED) {
            data.set_missing_field(&missing);
            return Ok(data);
        }

        let store = self.ctx.records.store();
        let user_id = data
            .get("user")
            .and_then(|value| Entity::User.parse_id(value));
        let user_exists = match &user_id {
            Some(id) => store.exists(Entity::User, id)?,
            None => false,
        };
        let Some(user_id) = user_id.filter(|_| user_exists) else {
            data.set_error_message(
                &ErrorMessage::new("Invalid user", "does not exist"),
                Some("user"),
                true,
            );
            return Ok(data);
        };

        let token = data.get_str("token").unwrap_or_default().trim().to_string();
        let already = store.all(Entity::BlacklistedToken)?.iter().any(|entry| {
            entry.get("token").and_then(Value::as_str) == Some(token.as_str())
                && entry.get("user").is_some_and(|user| value_matches(user, &user_id))
        });
        if already {
            return Err(ValidationError::new("Token is already blacklisted").into());
        }

        data.insert("user", user_id);
        data.insert("token", Value::String(token));
        data.set_toast_message_value("Token");
        Ok(data)
    }

    async fn create(&mut self, data: &mut ValidatedData) -> Result<Value, HandlerError> {
        let user = data
            .get_str("user")
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| HandlerError::Fatal("user was not validated".to_string()))?;

        let record = BlacklistedToken {
            id: None,
            user,
            token: data.get_str("token").unwrap_or_default().to_string(),
            is_login: flag(data, "is_login"),
            is_delete: flag(data, "is_delete"),
            audit: AuditColumns::default(),
        }
        .to_record()?;

        let created = self
            .ctx
            .records
            .store()
            .insert(Entity::BlacklistedToken, record)?;
        Ok(public_record(Entity::BlacklistedToken, created))
    }
}
