use eventing_api::ApiError;
use thiserror::Error;

/// Errors that can occur in the subscription manager
#[derive(Error, Debug)]
pub enum EventManagerError {
    /// Invalid manager configuration
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A generated callback address was not a valid URL
    #[error("invalid callback address: {0}")]
    InvalidCallbackAddress(String),

    /// The initial subscribe handshake failed
    #[error("failed to subscribe filter \"{filter}\": {source}")]
    Subscribe {
        filter: String,
        #[source]
        source: ApiError,
    },

    /// The maintenance worker was started twice
    #[error("maintenance worker is already running")]
    AlreadyRunning,

    /// The maintenance worker thread could not be spawned
    #[error("failed to start maintenance worker: {0}")]
    WorkerSpawn(String),

    /// Error from an eventing operation
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for subscription manager operations
pub type Result<T> = std::result::Result<T, EventManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_error_carries_filter_context() {
        let error = EventManagerError::Subscribe {
            filter: "http://p11073/EpisodicMetricReport".to_string(),
            source: ApiError::Protocol("missing Expires".to_string()),
        };
        let rendered = format!("{}", error);
        assert!(rendered.contains("EpisodicMetricReport"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
