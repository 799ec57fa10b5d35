//! Conversational AI (Sensay) client.
//!
//! Two calls are used: provisioning an external user for a shopper and
//! sending that user's message to the configured replica.

mod client;
pub mod types;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::retry::{Transient, is_transient_transport};

pub use client::SensayClient;
pub use types::{ChatCompletion, SensayUser};

/// Something that answers a shopper's message on behalf of a replica user.
pub trait Replica {
    /// The replica's answer to `prompt`.
    fn complete(
        &self,
        sensay_user_id: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<ChatCompletion, SensayError>> + Send;
}

/// Errors that can occur when interacting with the Sensay API.
#[derive(Debug, Error)]
pub enum SensayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// API throttled the request.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The replica answered with `success: false`.
    #[error("Replica declined the message")]
    Declined,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Transient for SensayError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => is_transient_transport(e),
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited(_) => true,
            Self::Declined | Self::Parse(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(secs) => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = SensayError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let err = SensayError::Api {
            status: 401,
            message: "bad secret".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!SensayError::Declined.is_transient());
        assert!(!SensayError::Parse("eof".to_string()).is_transient());
    }

    #[test]
    fn test_rate_limit_carries_delay() {
        let err = SensayError::RateLimited(3);
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }
}
