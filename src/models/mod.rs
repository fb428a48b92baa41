//! Data models
//!
//! - [`schema`] declares every entity, its columns and foreign keys
//! - [`records`] holds the typed structs used when building records in code
//! - [`user`] creates users atomically with their detail record

mod enums;
mod error;
mod records;
pub mod schema;
mod user;

pub use enums::{capitalize, Choices, UserRole};
pub use error::ModelError;
pub use records::{
    AuditColumns, BlacklistedToken, City, Country, Model, State, User, UserDetail,
    UserRoleRecord,
};
pub use schema::{AppSpec, Entity, APPS};
pub use user::{check_password, hash_password, normalize_email, NewUser, UserManager};
