use super::models::Config;
use thiserror::Error;

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("page_size ({page_size}) must be between 1 and max_page_size ({max_page_size})")]
    InvalidPageSize {
        page_size: usize,
        max_page_size: usize,
    },

    #[error("Success message configured for unknown HTTP method '{0}'")]
    UnknownHttpMethod(String),

    #[error("Parameter name '{0}' must not be empty")]
    EmptyParameterName(&'static str),

    #[error("Invalid app path '{0}'")]
    InvalidAppPath(String),

    #[error("max_payload_bytes must be positive")]
    InvalidPayloadLimit,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_pagination(config)?;
    validate_views(config)?;
    validate_apps(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.max_payload_bytes == 0 {
        return Err(ValidationError::InvalidPayloadLimit);
    }
    Ok(())
}

fn validate_pagination(config: &Config) -> Result<(), ValidationError> {
    let pagination = &config.pagination;
    if pagination.page_size == 0 || pagination.page_size > pagination.max_page_size {
        return Err(ValidationError::InvalidPageSize {
            page_size: pagination.page_size,
            max_page_size: pagination.max_page_size,
        });
    }

    if pagination.page_query_param.trim().is_empty() {
        return Err(ValidationError::EmptyParameterName("page_query_param"));
    }
    if pagination.page_size_query_param.trim().is_empty() {
        return Err(ValidationError::EmptyParameterName("page_size_query_param"));
    }
    Ok(())
}

fn validate_views(config: &Config) -> Result<(), ValidationError> {
    if config.views.ordering_param_name.trim().is_empty() {
        return Err(ValidationError::EmptyParameterName("ordering_param_name"));
    }

    for method in config.views.success_messages.keys() {
        if !HTTP_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
            return Err(ValidationError::UnknownHttpMethod(method.clone()));
        }
    }
    Ok(())
}

/// App paths are dotted identifiers such as `user_config.user_auth`
fn validate_apps(config: &Config) -> Result<(), ValidationError> {
    for app in &config.apps.custom_apps {
        let well_formed = app.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
        if !well_formed {
            return Err(ValidationError::InvalidAppPath(app.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_page_size_above_max() {
        let mut config = Config::default();
        config.pagination.page_size = 500;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidPageSize { .. })));
    }

    #[test]
    fn test_unknown_method() {
        let mut config = Config::default();
        config
            .views
            .success_messages
            .insert("FETCH".to_string(), "Fetched".to_string());

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::UnknownHttpMethod(m)) if m == "FETCH"));
    }

    #[test]
    fn test_invalid_app_path() {
        let mut config = Config::default();
        config.apps.custom_apps.push("user_config..accounts".to_string());

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidAppPath(_))));
    }

    #[test]
    fn test_empty_ordering_param() {
        let mut config = Config::default();
        config.views.ordering_param_name = " ".to_string();

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::EmptyParameterName("ordering_param_name"))
        ));
    }
}
