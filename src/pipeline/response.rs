use std::fmt::Display;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::pagination::Page;
use crate::config::ViewsConfig;
use crate::handlers::{ValidatedData, ValidationError};
use crate::models::capitalize;

/// Every body the API returns
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success {
        message: String,
        results: Value,
    },
    Validation {
        message: Value,
        field_errors: Option<Value>,
    },
    Exception {
        message: String,
        error: String,
    },
    Page(Page),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Envelope,
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Formats envelopes using the view configuration
#[derive(Debug, Clone, Copy)]
pub struct ResponseBuilder<'a> {
    views: &'a ViewsConfig,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(views: &'a ViewsConfig) -> Self {
        Self { views }
    }

    /// Compose the display message: toast, a space, then the method message,
    /// trimmed and capitalized. Methods without a configured message use the
    /// toast alone.
    pub fn success_message(&self, method: &Method, toast: Option<&str>) -> String {
        let toast = toast.unwrap_or_default();
        let composed = match self.views.success_message(method.as_str()) {
            Some(message) => format!("{toast} {message}"),
            None => toast.to_string(),
        };
        capitalize(composed.trim())
    }

    pub fn success(&self, method: &Method, toast: Option<&str>, results: Value) -> ApiResponse {
        ApiResponse {
            status: StatusCode::OK,
            body: Envelope::Success {
                message: self.success_message(method, toast),
                results,
            },
        }
    }

    /// Error carried on the validated data
    pub fn validation(&self, data: &ValidatedData) -> ApiResponse {
        ApiResponse {
            status: StatusCode::BAD_REQUEST,
            body: Envelope::Validation {
                message: data.error_message().cloned().unwrap_or(Value::Null),
                field_errors: data.field_errors().cloned(),
            },
        }
    }

    /// Error raised by a handler as a typed validation error
    pub fn validation_error(&self, error: &ValidationError) -> ApiResponse {
        ApiResponse {
            status: StatusCode::BAD_REQUEST,
            body: Envelope::Validation {
                message: error.message.clone(),
                field_errors: error.field_errors.clone(),
            },
        }
    }

    pub fn exception(&self, error: &dyn Display) -> ApiResponse {
        ApiResponse {
            status: StatusCode::BAD_REQUEST,
            body: Envelope::Exception {
                message: self.views.exception_message.clone(),
                error: error.to_string(),
            },
        }
    }

    pub fn page(&self, page: Page) -> ApiResponse {
        ApiResponse {
            status: StatusCode::OK,
            body: Envelope::Page(page),
        }
    }

    /// Single record or plain payload without a message
    pub fn results(&self, results: Value) -> ApiResponse {
        self.success(&Method::GET, None, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ErrorMessage;
    use serde_json::json;

    #[test]
    fn test_toast_prefixes_method_message() {
        let views = ViewsConfig::default();
        let builder = ResponseBuilder::new(&views);

        assert_eq!(
            builder.success_message(&Method::POST, Some("done")),
            "Done successfully created"
        );
        assert_eq!(
            builder.success_message(&Method::DELETE, None),
            "Successfully deleted"
        );
        assert_eq!(builder.success_message(&Method::GET, Some("country")), "Country");
        assert_eq!(builder.success_message(&Method::GET, None), "");
    }

    #[test]
    fn test_success_envelope_shape() {
        let views = ViewsConfig::default();
        let response = ResponseBuilder::new(&views).success(&Method::PUT, Some("State"), json!({"id": 1}));

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&response.body).unwrap(),
            json!({"message": "State successfully updated", "results": {"id": 1}})
        );
    }

    #[test]
    fn test_validation_envelope_keeps_null_field_errors() {
        let views = ViewsConfig::default();
        let mut data = ValidatedData::default();
        data.set_error_message(&ErrorMessage::new("Oops", "bad"), None, false);

        let response = ResponseBuilder::new(&views).validation(&data);

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(&response.body).unwrap(),
            json!({"message": {"title": "Oops", "description": "bad"}, "field_errors": null})
        );
    }

    #[test]
    fn test_exception_envelope() {
        let views = ViewsConfig::default();
        let response = ResponseBuilder::new(&views).exception(&"boom");

        assert_eq!(
            serde_json::to_value(&response.body).unwrap(),
            json!({"message": "Internal Server Error", "error": "boom"})
        );
    }
}
