//! Generic list, retrieve and write views
//!
//! Each route is one of a handful of view shapes parameterised by a
//! [`ResourceView`]. Reads go through the queryset and object accessors;
//! writes are delegated to a named handler via the process pipeline.

use std::collections::BTreeMap;

use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{extract::State, Json};

use super::extract::ApiRequest;
use super::models::{Choice, HealthResponse};
use super::state::AppState;
use crate::models::schema::public_record;
use crate::models::{Choices, Entity, UserRole};
use crate::pipeline::{
    ApiResponse, FieldFilter, ObjectAccessor, PipelineRequest, PkScope, QuerysetAccessor,
};

/// Per-route view settings
#[derive(Debug, Clone, Copy)]
pub struct ResourceView {
    pub entity: Entity,
    /// Query parameters accepted as exact-match filters
    pub filter_fields: &'static [&'static str],
    pub lookup_field: &'static str,
}

impl ResourceView {
    pub const fn new(entity: Entity, filter_fields: &'static [&'static str]) -> Self {
        Self {
            entity,
            filter_fields,
            lookup_field: "id",
        }
    }

    /// Name of the registered handler for `action`
    pub fn handler(&self, action: &str) -> String {
        format!("{}.{action}", self.entity.table())
    }
}

pub const COUNTRIES: ResourceView = ResourceView::new(Entity::Country, &["name"]);
pub const STATES: ResourceView = ResourceView::new(Entity::State, &["name", "country"]);
pub const CITIES: ResourceView = ResourceView::new(Entity::City, &["name", "state", "country"]);
pub const ROLES: ResourceView = ResourceView::new(Entity::UserRole, &["role"]);
pub const USERS: ResourceView =
    ResourceView::new(Entity::User, &["email", "username", "is_active", "user_role"]);

/// Paginated, filtered and ordered listing
pub async fn list(state: &AppState, ApiRequest(request): ApiRequest, view: ResourceView) -> ApiResponse {
    let filter = FieldFilter::new(view.filter_fields);
    let accessor = QuerysetAccessor::new(
        state.store.record_set(view.entity),
        &state.config.views,
        &state.config.pagination,
        &filter,
    );

    match accessor.paginate(&request) {
        Ok(page) => state.pipeline.responses().page(page),
        Err(err) => state.pipeline.exception(&err),
    }
}

/// Single record resolved through `scope`
pub async fn retrieve(
    state: &AppState,
    ApiRequest(request): ApiRequest,
    view: ResourceView,
    scope: PkScope,
) -> ApiResponse {
    let accessor = ObjectAccessor::new(state.store.record_set(view.entity), scope, view.lookup_field);

    match accessor.get_object(&request) {
        Ok(record) => state
            .pipeline
            .responses()
            .results(public_record(view.entity, record)),
        Err(err) => state.pipeline.exception(&err),
    }
}

/// Delegate a write to the named handler
pub async fn process(
    state: &AppState,
    ApiRequest(request): ApiRequest,
    handler: String,
    entity: Entity,
) -> ApiResponse {
    state
        .pipeline
        .handle_request(PipelineRequest {
            handler,
            request,
            records: state.store.record_set(entity),
            instance: None,
        })
        .await
}

/// Resolve the target record from the path, then delegate to the handler
pub async fn process_instance(
    state: &AppState,
    ApiRequest(request): ApiRequest,
    view: ResourceView,
    action: &str,
) -> ApiResponse {
    let records = state.store.record_set(view.entity);
    let accessor = ObjectAccessor::new(records.clone(), PkScope::Kwargs, view.lookup_field);

    let instance = match accessor.get_object(&request) {
        Ok(instance) => instance,
        Err(err) => return state.pipeline.exception(&err),
    };

    state
        .pipeline
        .handle_request(PipelineRequest {
            handler: view.handler(action),
            request,
            records,
            instance: Some(instance),
        })
        .await
}

/// Handler-computed list, paginated
pub async fn paginated(
    state: &AppState,
    ApiRequest(request): ApiRequest,
    handler: &str,
    entity: Entity,
) -> ApiResponse {
    state
        .pipeline
        .handle_paginated(PipelineRequest {
            handler: handler.to_string(),
            request,
            records: state.store.record_set(entity),
            instance: None,
        })
        .await
}

/// `GET /roles/choices`
pub async fn role_choices(State(state): State<AppState>) -> ApiResponse {
    let choices: Vec<Choice> = UserRole::choices()
        .into_iter()
        .map(|(value, label)| Choice { value, label })
        .collect();

    match serde_json::to_value(choices) {
        Ok(results) => state.pipeline.responses().results(results),
        Err(err) => state.pipeline.exception(&err),
    }
}

/// Health check endpoint (GET /health)
///
/// Reports the record store and the pipeline counters. Returns 503 if the
/// store cannot be read.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let records = match state.store.stats() {
        Ok(stats) => {
            components.insert("store".to_string(), "healthy".to_string());
            stats.records
        }
        Err(err) => {
            components.insert("store".to_string(), format!("unhealthy: {err}"));
            BTreeMap::new()
        }
    };

    let all_healthy = components.values().all(|status| status == "healthy");
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        components,
        records,
        pipeline: state.metrics.snapshot(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

/// Body for unmatched routes, in the exception envelope
pub async fn not_found(State(state): State<AppState>, method: Method, uri: Uri) -> ApiResponse {
    let mut response = state
        .pipeline
        .responses()
        .exception(&format!("no route for {method} {}", uri.path()));
    response.status = StatusCode::NOT_FOUND;
    response
}
