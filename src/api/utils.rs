//! Stateless helpers for request decoding

use crate::api::error::ApiError;

/// How a request body is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Multipart,
}

/// Classify a Content-Type header value.
///
/// Accepts `application/json` (and `+json` suffixes), urlencoded forms and
/// `multipart/form-data`, with or without parameters.
pub fn parse_content_type(content_type: &str) -> Result<BodyKind, ApiError> {
    let media_type: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}")))?;

    let (ty, sub) = (media_type.type_(), media_type.subtype());
    if ty == mime::APPLICATION && (sub == mime::JSON || media_type.suffix() == Some(mime::JSON)) {
        Ok(BodyKind::Json)
    } else if ty == mime::APPLICATION && sub == mime::WWW_FORM_URLENCODED {
        Ok(BodyKind::Form)
    } else if ty == mime::MULTIPART && sub == mime::FORM_DATA {
        Ok(BodyKind::Multipart)
    } else {
        Err(ApiError::UnsupportedMediaType(format!("{ty}/{sub}")))
    }
}

/// Checks the decoded body against the configured limit
pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(max_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type_kinds() {
        assert_eq!(parse_content_type("application/json").unwrap(), BodyKind::Json);
        assert_eq!(
            parse_content_type("application/json; charset=utf-8").unwrap(),
            BodyKind::Json
        );
        assert_eq!(
            parse_content_type("application/merge-patch+json").unwrap(),
            BodyKind::Json
        );
        assert_eq!(
            parse_content_type("application/x-www-form-urlencoded").unwrap(),
            BodyKind::Form
        );
        assert_eq!(
            parse_content_type("multipart/form-data; boundary=xyz").unwrap(),
            BodyKind::Multipart
        );
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(matches!(
            parse_content_type("text/plain"),
            Err(ApiError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            parse_content_type("invalid"),
            Err(ApiError::InvalidPayload(_))
        ));
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_validate_body_size() {
        let data = vec![0u8; 1000];
        assert!(validate_body_size(&data, 1000).is_ok());
        assert!(validate_body_size(&[], 100).is_ok());
        assert!(matches!(
            validate_body_size(&data, 999),
            Err(ApiError::PayloadTooLarge(999))
        ));
    }
}
