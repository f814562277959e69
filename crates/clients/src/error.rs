// crates/clients/src/error.rs
use thiserror::Error;

/// Errors from the outbound service clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration detected at construction time. Raised loudly
    /// and immediately -- never deferred to the first request.
    #[error("Invalid {service} configuration: {message}")]
    Config {
        service: &'static str,
        message: String,
    },

    /// The service answered with a non-success HTTP status.
    #[error("{service} returned HTTP {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The request never produced a response (connect/timeout/transport).
    #[error("Request to {service} failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The response arrived but its JSON did not have the expected shape.
    #[error("Unexpected response from {service}: {message}")]
    Schema {
        service: &'static str,
        message: String,
    },
}

impl ClientError {
    pub fn config(service: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            service,
            message: message.into(),
        }
    }

    pub fn schema(service: &'static str, message: impl Into<String>) -> Self {
        Self::Schema {
            service,
            message: message.into(),
        }
    }

    /// Classify a completed-but-unsuccessful response.
    pub fn from_status(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            service,
            status,
            message: message.into(),
        }
    }

    /// The upstream HTTP status, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this is an upstream 404 -- a not-found condition, not a fault.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ClientError::config("hackatime", "admin token is empty");
        assert!(err.to_string().contains("hackatime"));
        assert!(err.to_string().contains("admin token is empty"));
    }

    #[test]
    fn test_status_classification() {
        let err = ClientError::from_status("codehost", 404, "Not Found");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());

        let err = ClientError::from_status("hackatime", 500, "boom");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_schema_error_has_no_status() {
        let err = ClientError::schema("spreadsheet", "records is not an array");
        assert_eq!(err.status(), None);
        assert!(!err.is_not_found());
    }
}
