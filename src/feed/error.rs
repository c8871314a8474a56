use thiserror::Error;

use crate::domain::UnknownFeedKind;
use crate::transport::TransportError;

/// Closed classification of everything that can go wrong with a feed.
///
/// Built once from a [`TransportError`] at the adapter boundary; never
/// re-derived from message text afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Authentication failed. Please re-login. ({0})")]
    Auth(String),

    #[error("Access denied: {0}")]
    Permission(String),

    #[error("Rate limit exceeded. Please wait before trying again. ({0})")]
    RateLimit(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error. Please try again later. ({0})")]
    Server(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("{message}")]
    Unknown { code: Option<String>, message: String },
}

impl FeedError {
    /// Whether pulling again can succeed without the user changing the
    /// descriptor, the credential, or their access.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FeedError::Configuration(_)
                | FeedError::Auth(_)
                | FeedError::Permission(_)
                | FeedError::NotFound(_)
        )
    }
}

impl From<UnknownFeedKind> for FeedError {
    fn from(e: UnknownFeedKind) -> Self {
        FeedError::Configuration(e.to_string())
    }
}

impl From<TransportError> for FeedError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Network(message) => FeedError::Network(message),
            TransportError::Timeout(message) => FeedError::Timeout(message),
            TransportError::Http { status, message } => {
                classify_status(status, message.clone()).unwrap_or(FeedError::Unknown {
                    code: Some(status.to_string()),
                    message,
                })
            }
            TransportError::Api {
                status,
                code,
                message,
            } => {
                let detail = if message.is_empty() {
                    format!("API Error: {}", code)
                } else {
                    message
                };
                classify_code(&code, detail.clone())
                    .or_else(|| classify_status(status, detail.clone()))
                    .unwrap_or(FeedError::Unknown {
                        code: Some(code),
                        message: detail,
                    })
            }
            TransportError::InvalidResponse(message) => FeedError::Unknown {
                code: None,
                message,
            },
        }
    }
}

fn classify_code(code: &str, detail: String) -> Option<FeedError> {
    let error = match code {
        "INVALID_TOKEN" | "CREDENTIAL_REQUIRED" => FeedError::Auth(detail),
        "BLOCKED" | "SUSPENDED" | "FORBIDDEN" => FeedError::Permission(detail),
        "RATE_LIMIT_EXCEEDED" => FeedError::RateLimit(detail),
        "NO_SUCH_LIST" | "NO_SUCH_USER" | "NO_SUCH_NOTE" => FeedError::NotFound(detail),
        _ => return None,
    };
    Some(error)
}

fn classify_status(status: u16, detail: String) -> Option<FeedError> {
    let error = match status {
        401 => FeedError::Auth(detail),
        403 => FeedError::Permission(detail),
        404 => FeedError::NotFound(detail),
        429 => FeedError::RateLimit(detail),
        500..=599 => FeedError::Server(detail),
        _ => return None,
    };
    Some(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str) -> TransportError {
        TransportError::Api {
            status,
            code: code.into(),
            message: String::new(),
        }
    }

    #[test]
    fn test_domain_codes() {
        assert!(matches!(FeedError::from(api(401, "INVALID_TOKEN")), FeedError::Auth(_)));
        assert!(matches!(
            FeedError::from(api(401, "CREDENTIAL_REQUIRED")),
            FeedError::Auth(_)
        ));
        assert!(matches!(FeedError::from(api(403, "BLOCKED")), FeedError::Permission(_)));
        assert!(matches!(FeedError::from(api(403, "SUSPENDED")), FeedError::Permission(_)));
        assert!(matches!(
            FeedError::from(api(429, "RATE_LIMIT_EXCEEDED")),
            FeedError::RateLimit(_)
        ));
        assert!(matches!(FeedError::from(api(400, "NO_SUCH_LIST")), FeedError::NotFound(_)));
        assert!(matches!(FeedError::from(api(400, "NO_SUCH_USER")), FeedError::NotFound(_)));
    }

    #[test]
    fn test_code_takes_precedence_over_status() {
        assert!(matches!(
            FeedError::from(api(400, "RATE_LIMIT_EXCEEDED")),
            FeedError::RateLimit(_)
        ));
    }

    #[test]
    fn test_unknown_code_falls_back_to_status() {
        assert!(matches!(
            FeedError::from(api(500, "INTERNAL_ERROR")),
            FeedError::Server(_)
        ));
    }

    #[test]
    fn test_unknown_code_preserved() {
        let error = FeedError::from(api(400, "SOMETHING_NEW"));
        assert_eq!(
            error,
            FeedError::Unknown {
                code: Some("SOMETHING_NEW".into()),
                message: "API Error: SOMETHING_NEW".into(),
            }
        );
    }

    #[test]
    fn test_http_statuses() {
        let http = |status| TransportError::Http {
            status,
            message: "boom".into(),
        };
        assert!(matches!(FeedError::from(http(401)), FeedError::Auth(_)));
        assert!(matches!(FeedError::from(http(403)), FeedError::Permission(_)));
        assert!(matches!(FeedError::from(http(404)), FeedError::NotFound(_)));
        assert!(matches!(FeedError::from(http(503)), FeedError::Server(_)));
        assert_eq!(
            FeedError::from(http(418)),
            FeedError::Unknown {
                code: Some("418".into()),
                message: "boom".into(),
            }
        );
    }

    #[test]
    fn test_network_and_timeout() {
        assert_eq!(
            FeedError::from(TransportError::Network("dns".into())),
            FeedError::Network("dns".into())
        );
        assert_eq!(
            FeedError::from(TransportError::Timeout("10s".into())),
            FeedError::Timeout("10s".into())
        );
    }

    #[test]
    fn test_invalid_response_is_unknown() {
        let error =
            FeedError::from(TransportError::InvalidResponse("Invalid response format".into()));
        assert_eq!(error.to_string(), "Invalid response format");
    }

    #[test]
    fn test_retryable_classes() {
        assert!(!FeedError::Configuration("x".into()).is_retryable());
        assert!(!FeedError::Auth("x".into()).is_retryable());
        assert!(!FeedError::NotFound("x".into()).is_retryable());
        assert!(FeedError::Network("x".into()).is_retryable());
        assert!(FeedError::RateLimit("x".into()).is_retryable());
        assert!(FeedError::ConnectionLost("x".into()).is_retryable());
    }
}
