use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::pipeline::queryset::PkScope;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub apps: AppsConfig,
    #[serde(default)]
    pub views: ViewsConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Directory of the record store keyspace
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Upper bound for request bodies, in bytes
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_path: default_data_path(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/weepstay")
}

fn default_max_payload_bytes() -> usize {
    5 * 1024 * 1024 // 5 MB
}

/// Apps managed by the migration commands
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppsConfig {
    /// Dotted app paths; the last segment is the app label
    #[serde(default = "default_custom_apps")]
    pub custom_apps: Vec<String>,
    /// Directory that app paths are resolved against
    #[serde(default = "default_migrations_root")]
    pub migrations_root: PathBuf,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            custom_apps: default_custom_apps(),
            migrations_root: default_migrations_root(),
        }
    }
}

fn default_custom_apps() -> Vec<String> {
    vec![
        "core_utils".to_string(),
        "core_utils.region_data".to_string(),
        "user_config.user_auth".to_string(),
        "user_config.accounts".to_string(),
    ]
}

fn default_migrations_root() -> PathBuf {
    PathBuf::from(".")
}

/// Behaviour shared by every generic view
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewsConfig {
    /// Query parameter carrying the requested ordering
    #[serde(default = "default_ordering_param_name")]
    pub ordering_param_name: String,
    /// Ordering applied when the request names none
    #[serde(default = "default_ordering_field")]
    pub default_ordering_field: String,
    /// Message of the generic exception envelope
    #[serde(default = "default_exception_message")]
    pub exception_message: String,
    /// Success message per HTTP method
    #[serde(default = "default_success_messages")]
    pub success_messages: BTreeMap<String, String>,
    /// Lookup scope of the user detail endpoint
    #[serde(default = "default_user_lookup")]
    pub user_lookup: PkScope,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            ordering_param_name: default_ordering_param_name(),
            default_ordering_field: default_ordering_field(),
            exception_message: default_exception_message(),
            success_messages: default_success_messages(),
            user_lookup: default_user_lookup(),
        }
    }
}

impl ViewsConfig {
    pub fn success_message(&self, method: &str) -> Option<&str> {
        self.success_messages
            .iter()
            .find(|(configured, _)| configured.eq_ignore_ascii_case(method))
            .map(|(_, message)| message.as_str())
    }
}

fn default_ordering_param_name() -> String {
    "ordering".to_string()
}

fn default_ordering_field() -> String {
    "-created_at".to_string()
}

fn default_exception_message() -> String {
    "Internal Server Error".to_string()
}

fn default_success_messages() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("POST".to_string(), "Successfully Created".to_string()),
        ("PUT".to_string(), "Successfully Updated".to_string()),
        ("DELETE".to_string(), "Successfully Deleted".to_string()),
    ])
}

fn default_user_lookup() -> PkScope {
    PkScope::Params
}

/// Page-number pagination
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    #[serde(default = "default_page_query_param")]
    pub page_query_param: String,
    #[serde(default = "default_page_size_query_param")]
    pub page_size_query_param: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            page_query_param: default_page_query_param(),
            page_size_query_param: default_page_size_query_param(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    100
}

fn default_page_query_param() -> String {
    "page".to_string()
}

fn default_page_size_query_param() -> String {
    "page_size".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.max_payload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.apps.custom_apps.len(), 4);
        assert_eq!(config.views.default_ordering_field, "-created_at");
        assert_eq!(config.pagination.page_size, 10);
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_success_message_lookup() {
        let views = ViewsConfig::default();
        assert_eq!(views.success_message("post"), Some("Successfully Created"));
        assert_eq!(views.success_message("DELETE"), Some("Successfully Deleted"));
        assert_eq!(views.success_message("GET"), None);
    }

    #[test]
    fn test_unknown_lookup_scope_rejected() {
        let result: Result<ViewsConfig, _> = toml::from_str(r#"user_lookup = "HEADERS""#);
        assert!(result.is_err());

        let views: ViewsConfig = toml::from_str(r#"user_lookup = "BODY""#).unwrap();
        assert_eq!(views.user_lookup, PkScope::Body);
    }
}
