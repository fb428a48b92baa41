use serde_json::Value;
use tracing::info;

use super::CommandError;
use crate::models::schema::public_record;
use crate::models::{Entity, NewUser, UserDetail, UserManager};
use crate::store::RecordStore;

/// Create an active staff superuser with an empty detail record
pub fn create_superuser(
    store: &RecordStore,
    email: &str,
    password: &str,
    username: Option<String>,
) -> Result<Value, CommandError> {
    let (user, _detail) = UserManager::new(store).create_superuser(
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            username,
            ..Default::default()
        },
        UserDetail::default(),
    )?;
    store.persist()?;

    info!(email, "Superuser created");
    Ok(public_record(Entity::User, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::check_password;
    use tempfile::TempDir;

    #[test]
    fn test_superuser_flags_and_detail() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("db")).unwrap();

        let user = create_superuser(&store, "Root@Example.COM", "s3cret", None).unwrap();

        assert_eq!(user["email"], "Root@example.com");
        assert_eq!(user["is_superuser"], true);
        assert_eq!(user["is_staff"], true);
        assert_eq!(user["is_active"], true);
        assert!(user.get("password").is_none());

        let stored = store.get(Entity::User, &user["id"]).unwrap().unwrap();
        assert!(check_password("s3cret", stored["password"].as_str().unwrap()));
        assert_eq!(store.all(Entity::UserDetail).unwrap().len(), 1);
        assert!(matches!(stored.get("id"), Some(Value::String(_))));
    }

    #[test]
    fn test_missing_email_rejected() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("db")).unwrap();

        assert!(matches!(
            create_superuser(&store, " ", "pw", None),
            Err(CommandError::Model(_))
        ));
        assert!(store.all(Entity::User).unwrap().is_empty());
    }
}
