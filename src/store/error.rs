use thiserror::Error;

use crate::models::schema::FieldViolation;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} matching query does not exist.")]
    NotFound { entity: &'static str },

    #[error("get() returned more than one {entity} -- it returned {count}!")]
    MultipleReturned { entity: &'static str, count: usize },

    #[error("{entity} with this {field} already exists.")]
    UniqueViolation { entity: &'static str, field: String },

    #[error("{entity}.{field} references missing {target} {id}")]
    MissingReference {
        entity: &'static str,
        field: String,
        target: &'static str,
        id: String,
    },

    #[error("Constraint violated: {0}")]
    Constraint(#[from] FieldViolation),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
