use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::types::{DataMap, HandlerContext, ValidatedData};
use crate::models::ModelError;
use crate::pipeline::queryset::LookupError;
use crate::store::StoreError;

/// Typed validation failure, rendered like a data-carried `error_message`
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: Value,
    pub field_errors: Option<Value>,
}

impl ValidationError {
    pub fn new(message: impl Into<Value>) -> Self {
        Self {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn with_field_errors(mut self, field_errors: Value) -> Self {
        self.field_errors = Some(field_errors);
        self
    }
}

/// Handler errors
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("fatal handler error: {0}")]
    Fatal(String),
}

/// Domain logic behind a write endpoint
///
/// A handler is built per request from a [`HandlerContext`], receives the
/// merged request data in `validate` and performs its side effects in
/// `create`. `create` is only called when `validate` left no
/// `error_message` on the data.
#[async_trait]
pub trait Handler: Send {
    /// Inspect and normalize the incoming data.
    ///
    /// Problems can be reported either by setting `error_message` /
    /// `field_errors` on the returned data or by returning
    /// [`HandlerError::Validation`].
    async fn validate(&mut self, data: DataMap) -> Result<ValidatedData, HandlerError>;

    /// Perform the operation and return the response payload
    async fn create(&mut self, data: &mut ValidatedData) -> Result<Value, HandlerError>;
}

/// Builds a fresh handler for each request
pub trait HandlerFactory: Send + Sync {
    fn build(&self, ctx: HandlerContext) -> Box<dyn Handler>;
}

impl<F> HandlerFactory for F
where
    F: Fn(HandlerContext) -> Box<dyn Handler> + Send + Sync,
{
    fn build(&self, ctx: HandlerContext) -> Box<dyn Handler> {
        self(ctx)
    }
}
