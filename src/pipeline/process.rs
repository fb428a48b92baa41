use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::pagination::Paginator;
use super::queryset::LookupError;
use super::request::{merge_request_data, RequestParts};
use super::response::{ApiResponse, ResponseBuilder};
use crate::config::{PaginationConfig, ViewsConfig};
use crate::handlers::{
    ErrorMessage, HandlerContext, HandlerError, HandlerRegistry, RegistryError, ValidatedData,
};
use crate::observability::Metrics;
use crate::store::{Record, RecordSet};

const DEV_ERROR_TITLE: &str = "Developer error";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("expected a list to paginate, got {0}")]
    NotAList(&'static str),
}

/// Request lifecycle, logged as it advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Merged,
    Validated,
    Errored,
    Created,
    Responded,
}

enum Outcome {
    Rejected(ApiResponse),
    Created {
        payload: Value,
        toast: Option<String>,
    },
}

/// What a view hands to the pipeline
pub struct PipelineRequest {
    pub handler: String,
    pub request: Arc<RequestParts>,
    pub records: RecordSet,
    pub instance: Option<Record>,
}

/// Merge, validate, delegate to the handler, respond
#[derive(Clone)]
pub struct ProcessPipeline {
    registry: Arc<HandlerRegistry>,
    views: ViewsConfig,
    pagination: PaginationConfig,
    metrics: Arc<Metrics>,
}

impl ProcessPipeline {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        views: ViewsConfig,
        pagination: PaginationConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            views,
            pagination,
            metrics,
        }
    }

    pub fn responses(&self) -> ResponseBuilder<'_> {
        ResponseBuilder::new(&self.views)
    }

    pub fn views(&self) -> &ViewsConfig {
        &self.views
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Run the pipeline; any error becomes the exception envelope
    pub async fn handle_request(&self, input: PipelineRequest) -> ApiResponse {
        let response = match self.process(input).await {
            Ok(response) => response,
            Err(err) => self.exception(&err),
        };
        debug!(stage = ?PipelineStage::Responded, status = %response.status);
        response
    }

    /// Like [`handle_request`](Self::handle_request) but paginates the payload
    pub async fn handle_paginated(&self, input: PipelineRequest) -> ApiResponse {
        let response = match self.process_paginated(input).await {
            Ok(response) => response,
            Err(err) => self.exception(&err),
        };
        debug!(stage = ?PipelineStage::Responded, status = %response.status);
        response
    }

    /// Turn an uncaught error into the generic envelope
    pub fn exception(&self, err: &dyn std::fmt::Display) -> ApiResponse {
        error!(error = %err, "Request failed");
        self.metrics.exception_caught();
        self.responses().exception(err)
    }

    pub async fn process(&self, input: PipelineRequest) -> Result<ApiResponse, PipelineError> {
        let method = input.request.method.clone();
        match self.run(input).await? {
            Outcome::Rejected(response) => Ok(response),
            Outcome::Created { payload, toast } => {
                self.metrics.request_succeeded();
                Ok(self.responses().success(&method, toast.as_deref(), payload))
            }
        }
    }

    pub async fn process_paginated(
        &self,
        input: PipelineRequest,
    ) -> Result<ApiResponse, PipelineError> {
        let request = Arc::clone(&input.request);
        match self.run(input).await? {
            Outcome::Rejected(response) => Ok(response),
            Outcome::Created { payload, .. } => {
                let items = match payload {
                    Value::Array(items) => items,
                    other => return Err(PipelineError::NotAList(json_kind(&other))),
                };
                let page = Paginator::new(&self.pagination).paginate(items, &request.query)?;
                self.metrics.request_succeeded();
                Ok(self.responses().page(page))
            }
        }
    }

    async fn run(&self, input: PipelineRequest) -> Result<Outcome, PipelineError> {
        let PipelineRequest {
            handler,
            request,
            records,
            instance,
        } = input;
        debug!(stage = ?PipelineStage::Received, handler = %handler, path = %request.path);

        let data = merge_request_data(&request);
        debug!(stage = ?PipelineStage::Merged, fields = data.len());

        let mut ctx = HandlerContext::new(Arc::clone(&request), records, request.kwargs.clone());
        if let Some(instance) = instance {
            ctx = ctx.with_instance(instance);
        }
        let mut handler = self.registry.build(&handler, ctx)?;

        let mut validated = match handler.validate(data).await {
            Ok(validated) => validated,
            Err(HandlerError::Validation(err)) => {
                warn!(stage = ?PipelineStage::Errored, error = %err, "Validation failed");
                self.metrics.validation_failed();
                return Ok(Outcome::Rejected(self.responses().validation_error(&err)));
            }
            Err(err) => return Err(err.into()),
        };
        debug!(stage = ?PipelineStage::Validated, fields = validated.as_map().len());

        if validated.error_message().is_some() {
            warn!(stage = ?PipelineStage::Errored, "Validation failed");
            self.metrics.validation_failed();
            return Ok(Outcome::Rejected(self.responses().validation(&validated)));
        }

        if validated.is_empty() && !request.body.is_empty() {
            warn!(stage = ?PipelineStage::Errored, "Handler returned no data");
            self.metrics.validation_failed();
            let mut empty = ValidatedData::default();
            empty.set_error_message(
                &ErrorMessage::new(DEV_ERROR_TITLE, "api data is None"),
                None,
                false,
            );
            return Ok(Outcome::Rejected(self.responses().validation(&empty)));
        }

        validated.clear_error_message();
        let payload = handler.create(&mut validated).await?;
        debug!(stage = ?PipelineStage::Created);

        Ok(Outcome::Created {
            payload,
            toast: validated.toast_message_value(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
