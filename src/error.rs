//! Error kinds produced by the geo-ranking pipeline.

use thiserror::Error;

/// Everything that can stop the pipeline from reaching a ranking.
#[derive(Debug, Error)]
pub enum FinderError {
    /// The geolocator could not produce the user's coordinates.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// `POST /tokens` failed or returned something without a usable token.
    #[error("token acquisition failed: {0}")]
    TokenAcquisition(String),

    /// No HTTP response at all (DNS, connect, TLS, client timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP 401 from the shop endpoint.
    #[error("token rejected by the shop endpoint")]
    RetryWithNewToken,

    /// HTTP 406 from the shop endpoint.
    #[error("unacceptable Accept format")]
    UnacceptableFormat,

    /// HTTP 503 from the shop endpoint.
    #[error("shop service unavailable")]
    ServiceUnavailable,

    /// HTTP 504 from the shop endpoint.
    #[error("shop service timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<FinderError>,
    },

    #[error("invalid API base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl FinderError {
    /// Errors recovered by throwing the current token away and fetching again.
    pub fn needs_new_token(&self) -> bool {
        matches!(self, FinderError::RetryWithNewToken | FinderError::Timeout)
    }

    /// Errors worth waiting out with a back-off sleep before the next attempt.
    pub fn wants_backoff(&self) -> bool {
        matches!(self, FinderError::ServiceUnavailable | FinderError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_rejection_and_timeout_need_new_token() {
        assert!(FinderError::RetryWithNewToken.needs_new_token());
        assert!(FinderError::Timeout.needs_new_token());
        assert!(!FinderError::ServiceUnavailable.needs_new_token());
        assert!(!FinderError::UnacceptableFormat.needs_new_token());
        assert!(!FinderError::UnexpectedStatus(500).needs_new_token());
    }

    #[test]
    fn only_server_side_waits_back_off() {
        assert!(FinderError::ServiceUnavailable.wants_backoff());
        assert!(FinderError::Timeout.wants_backoff());
        assert!(!FinderError::RetryWithNewToken.wants_backoff());
        assert!(!FinderError::LocationUnavailable("denied".into()).wants_backoff());
    }

    #[test]
    fn exhausted_message_names_last_error() {
        let err = FinderError::RetriesExhausted {
            attempts: 4,
            last: Box::new(FinderError::RetryWithNewToken),
        };
        assert_eq!(
            err.to_string(),
            "gave up after 4 attempts: token rejected by the shop endpoint"
        );
    }
}
