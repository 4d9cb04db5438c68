use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Could not connect to upstream: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("Authentication failed with status {status}")]
    AuthenticationFailed { status: u16 },

    #[error("Issue not found: {issue_key}")]
    NotFound { issue_key: String },

    #[error("Unexpected status: {status} - {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::RequestFailed(_) | ApiError::ConnectionFailed { .. } | ApiError::Timeout { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthenticationFailed { status } | ApiError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::AuthenticationFailed { .. } => {
                Some("Verify jira.username and jira.token (JIRA_USERNAME / JIRA_TOKEN)")
            }
            ApiError::NotFound { .. } => Some("Check the issue key and that jira.url ends where the key belongs"),
            ApiError::Timeout { .. } => Some("Raise fetch.timeout_secs or check upstream latency"),
            ApiError::ConnectionFailed { .. } => Some("Check jira.url and network reachability"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ApiError::Timeout {
            after: Duration::from_secs(1)
        }
        .is_transport());
        assert!(ApiError::ConnectionFailed {
            message: "refused".to_string()
        }
        .is_transport());
        assert!(!ApiError::NotFound {
            issue_key: "AAA-1".to_string()
        }
        .is_transport());
        assert!(!ApiError::InvalidResponse("not an object".to_string()).is_transport());
    }

    #[test]
    fn test_status() {
        assert_eq!(
            ApiError::NotFound {
                issue_key: "AAA-1".to_string()
            }
            .status(),
            Some(404)
        );
        assert_eq!(
            ApiError::UnexpectedStatus {
                status: 502,
                message: String::new()
            }
            .status(),
            Some(502)
        );
        assert_eq!(
            ApiError::Timeout {
                after: Duration::from_secs(1)
            }
            .status(),
            None
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = ApiError::Timeout {
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Request timed out after 250ms");
        assert!(err.suggestion().is_some());
    }
}
