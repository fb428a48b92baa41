use axum::http::{header, HeaderMap, Method};

use crate::handlers::DataMap;

/// Transport-independent view of one request
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Decoded body fields (JSON object, form fields or multipart parts)
    pub body: DataMap,
    pub query: DataMap,
    /// Path parameters captured by the route
    pub kwargs: DataMap,
}

impl RequestParts {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type()
            .parse::<mime::Mime>()
            .is_ok_and(|mime| mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA)
    }
}

/// Consolidate the request input into one map.
///
/// Multipart requests yield their parts only. Otherwise body fields are
/// overlaid by query parameters, which are overlaid by path parameters.
pub fn merge_request_data(request: &RequestParts) -> DataMap {
    if request.is_multipart() {
        return request.body.clone();
    }

    let mut merged = request.body.clone();
    for source in [&request.query, &request.kwargs] {
        for (key, value) in source {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
