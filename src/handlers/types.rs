use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::pipeline::request::RequestParts;
use crate::store::{Record, RecordSet};

/// Untyped key-value payload flowing through the pipeline
pub type DataMap = Map<String, Value>;

pub const ERROR_MESSAGE_KEY: &str = "error_message";
pub const FIELD_ERRORS_KEY: &str = "field_errors";
pub const TOAST_MESSAGE_KEY: &str = "toast_message_value";

/// Python-style truthiness: null, false, 0, "" and empty containers are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Error description shown to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub title: String,
    pub description: String,
}

impl ErrorMessage {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("title".to_string(), Value::String(self.title.clone()));
        map.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        Value::Object(map)
    }
}

/// First required field found missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    pub key: String,
    pub message: String,
}

/// Check `required` in declaration order and report the first key that is
/// absent or falsy in `data`.
pub fn required_field_validation(data: &DataMap, required: &[(&str, &str)]) -> Option<MissingField> {
    required
        .iter()
        .find(|(key, _)| !data.get(*key).is_some_and(is_truthy))
        .map(|(key, message)| MissingField {
            key: (*key).to_string(),
            message: (*message).to_string(),
        })
}

/// Data map threaded from `validate` to `create`
///
/// Besides the payload itself it may carry the reserved keys
/// `error_message`, `field_errors` and `toast_message_value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedData(DataMap);

impl ValidatedData {
    pub fn new(data: DataMap) -> Self {
        Self(data)
    }

    pub fn as_map(&self) -> &DataMap {
        &self.0
    }

    pub fn into_inner(self) -> DataMap {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// The global error, if one was set and is non-empty
    pub fn error_message(&self) -> Option<&Value> {
        self.0.get(ERROR_MESSAGE_KEY).filter(|value| is_truthy(value))
    }

    pub fn field_errors(&self) -> Option<&Value> {
        self.0.get(FIELD_ERRORS_KEY).filter(|value| !value.is_null())
    }

    pub fn toast_message_value(&self) -> Option<String> {
        match self.0.get(TOAST_MESSAGE_KEY)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null | Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn set_toast_message_value(&mut self, value: impl Into<String>) {
        self.0
            .insert(TOAST_MESSAGE_KEY.to_string(), Value::String(value.into()));
    }

    /// Record an error on the data map.
    ///
    /// With a `key` the error is also stored under `field_errors[key]`; field
    /// errors are flattened to `"<key> <description>"`. The global
    /// `error_message` always ends up set.
    pub fn set_error_message(&mut self, message: &ErrorMessage, key: Option<&str>, is_field_error: bool) {
        let mut value = message.to_value();

        if let Some(key) = key.filter(|key| !key.is_empty()) {
            if is_field_error {
                value = Value::String(format!("{} {}", key, message.description));
            }

            let field_errors = self
                .0
                .entry(FIELD_ERRORS_KEY.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !field_errors.is_object() {
                *field_errors = Value::Object(Map::new());
            }
            if let Value::Object(errors) = field_errors {
                errors.insert(key.to_string(), value.clone());
            }
        }

        self.0.insert(ERROR_MESSAGE_KEY.to_string(), value);
    }

    /// Record a missing required field as a keyed error
    pub fn set_missing_field(&mut self, missing: &MissingField) {
        let message = ErrorMessage::new("Required field missing", missing.message.clone());
        self.set_error_message(&message, Some(&missing.key), false);
    }

    /// Drop a cleared error so it does not leak into the payload
    pub fn clear_error_message(&mut self) {
        if self.0.get(ERROR_MESSAGE_KEY).is_some_and(|value| !is_truthy(value)) {
            self.0.remove(ERROR_MESSAGE_KEY);
        }
    }
}

impl From<DataMap> for ValidatedData {
    fn from(data: DataMap) -> Self {
        Self(data)
    }
}

/// Everything a handler is bound to for the lifetime of one request
#[derive(Clone)]
pub struct HandlerContext {
    pub request: Arc<RequestParts>,
    /// Active record set of the view
    pub records: RecordSet,
    /// Extra values supplied by the view (path parameters and the like)
    pub context: DataMap,
    /// Resolved instance for update and delete endpoints
    pub instance: Option<Record>,
}

impl HandlerContext {
    pub fn new(request: Arc<RequestParts>, records: RecordSet, context: DataMap) -> Self {
        Self {
            request,
            records,
            context,
            instance: None,
        }
    }

    pub fn with_instance(mut self, instance: Record) -> Self {
        self.instance = Some(instance);
        self
    }
}
