use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid {entity} record: {source}")]
    Decode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("\"{0}\" is not a valid choice.")]
    UnknownChoice(String),
}
