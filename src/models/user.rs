use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use super::error::ModelError;
use super::records::{AuditColumns, Model, User, UserDetail};
use super::schema::Entity;
use crate::store::{Record, RecordStore};

const HASH_ALGORITHM: &str = "sha256";

/// Encode a password as `sha256$<salt>$<hex digest>`
pub fn hash_password(raw: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{HASH_ALGORITHM}${salt}${}", digest(&salt, raw))
}

pub fn check_password(raw: &str, encoded: &str) -> bool {
    let mut parts = encoded.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(HASH_ALGORITHM), Some(salt), Some(expected)) => digest(salt, raw) == expected,
        _ => false,
    }
}

fn digest(salt: &str, raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lowercase the domain part of an email address
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Fields accepted when creating a user
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub user_role: Option<Uuid>,
}

/// Creates users together with their detail record
pub struct UserManager<'a> {
    store: &'a RecordStore,
}

impl<'a> UserManager<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Create a regular user and its detail in one atomic write.
    ///
    /// If the detail record is rejected the user is not persisted either.
    pub fn create_user(
        &self,
        new_user: NewUser,
        detail: UserDetail,
    ) -> Result<(Record, Record), ModelError> {
        self.create(new_user, detail, false)
    }

    pub fn create_superuser(
        &self,
        new_user: NewUser,
        detail: UserDetail,
    ) -> Result<(Record, Record), ModelError> {
        self.create(new_user, detail, true)
    }

    fn create(
        &self,
        new_user: NewUser,
        mut detail: UserDetail,
        superuser: bool,
    ) -> Result<(Record, Record), ModelError> {
        if new_user.email.trim().is_empty() {
            return Err(ModelError::Invalid(
                "Users must have an email address".to_string(),
            ));
        }

        let user = User {
            id: None,
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: normalize_email(&new_user.email),
            phone_number: new_user.phone_number,
            user_role: new_user.user_role,
            is_active: true,
            is_staff: superuser,
            is_superuser: superuser,
            password: hash_password(&new_user.password),
            last_login: None,
            audit: AuditColumns::default(),
        };

        let mut write = self.store.atomic();
        let user = write.insert(Entity::User, user.to_record()?)?;

        detail.id = None;
        detail.user = user
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok());
        let detail = write.insert(Entity::UserDetail, detail.to_record()?)?;

        write.commit()?;

        let email = user.get("email").and_then(|email| email.as_str()).unwrap_or_default();
        info!(email, superuser, "Created user");
        Ok((user, detail))
    }
}
