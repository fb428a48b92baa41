use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request};
use axum::http::{header, StatusCode};
use axum::Form;
use serde_json::{json, Value};

use super::error::ApiError;
use super::state::AppState;
use super::utils::{parse_content_type, validate_body_size, BodyKind};
use crate::handlers::DataMap;
use crate::pipeline::{ApiResponse, RequestParts};

/// A request decoded into path, query and body maps
#[derive(Debug, Clone)]
pub struct ApiRequest(pub Arc<RequestParts>);

impl FromRequest<AppState> for ApiRequest {
    type Rejection = ApiResponse;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        decode(req, state)
            .await
            .map(|parts| ApiRequest(Arc::new(parts)))
            .map_err(|err| state.pipeline.exception(&err))
    }
}

async fn decode(req: Request, state: &AppState) -> Result<RequestParts, ApiError> {
    let (mut parts, body) = req.into_parts();

    // Routes without path parameters reject here; that is not an error
    let kwargs = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, state).await {
        Ok(Path(params)) => string_map(params),
        Err(_) => DataMap::new(),
    };
    let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(params)| string_map(params))
        .map_err(|err| ApiError::InvalidPayload(err.body_text()))?;

    let method = parts.method.clone();
    let headers = parts.headers.clone();
    let path = parts.uri.path().to_string();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let req = Request::from_parts(parts, body);
    let limit = state.config.server.max_payload_bytes;
    let body = match content_type.as_deref().map(parse_content_type).transpose()? {
        Some(BodyKind::Multipart) => read_multipart(req, state, limit).await?,
        Some(BodyKind::Form) => {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|err| ApiError::InvalidPayload(err.body_text()))?;
            string_map(fields)
        }
        Some(BodyKind::Json) | None => read_json(req, state, limit).await?,
    };

    Ok(RequestParts {
        method,
        path,
        headers,
        body,
        query,
        kwargs,
    })
}

fn string_map(params: HashMap<String, String>) -> DataMap {
    params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

async fn read_json(req: Request, state: &AppState, limit: usize) -> Result<DataMap, ApiError> {
    let bytes = Bytes::from_request(req, state).await.map_err(|err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(limit)
        } else {
            ApiError::InvalidPayload(err.body_text())
        }
    })?;
    validate_body_size(&bytes, limit)?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(DataMap::new());
    }
    match serde_json::from_slice(&bytes)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(DataMap::new()),
        _ => Err(ApiError::InvalidPayload("expected a JSON object".to_string())),
    }
}

/// Text parts become strings; file parts are described rather than stored
async fn read_multipart(req: Request, state: &AppState, limit: usize) -> Result<DataMap, ApiError> {
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|err| ApiError::InvalidPayload(err.body_text()))?;

    let map_err = |err: axum::extract::multipart::MultipartError| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(limit)
        } else {
            ApiError::InvalidPayload(err.body_text())
        }
    };

    let mut fields = DataMap::new();
    while let Some(field) = multipart.next_field().await.map_err(map_err)? {
        let name = field.name().unwrap_or_default().to_string();
        let value = match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(map_err)?;
                json!({
                    "file_name": file_name,
                    "content_type": content_type,
                    "size": data.len(),
                })
            }
            None => Value::String(field.text().await.map_err(map_err)?),
        };
        fields.insert(name, value);
    }
    Ok(fields)
}
