use soap_client::SoapError;
use thiserror::Error;

/// High-level errors for WS-Eventing operations
///
/// The variants form the closed outcome set of the eventing exchanges:
/// transport failures (the peer could not be reached or refused), SOAP
/// faults (the peer answered with a fault envelope), and protocol failures
/// (a well-formed response with the wrong shape or a missing field).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection-level or HTTP-status failure
    #[error("transport error: {0}")]
    Transport(SoapError),

    /// SOAP fault returned by the peer
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// Well-formed response with unexpected content
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid operation parameter or subscription state
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// True for failures of the exchange itself (connection, HTTP status,
    /// fault) as opposed to a response that arrived but had the wrong
    /// shape. Transport failures downgrade a subscription's health;
    /// protocol failures are surfaced to the caller.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Fault(_))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<SoapError> for ApiError {
    fn from(error: SoapError) -> Self {
        match error {
            SoapError::Network(_) | SoapError::Http { .. } => ApiError::Transport(error),
            SoapError::Parse(msg) => ApiError::Protocol(msg),
            SoapError::Fault(reason) => ApiError::Fault(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soap_error_conversion() {
        let error: ApiError = SoapError::Network("connection refused".to_string()).into();
        assert!(matches!(error, ApiError::Transport(_)));
        assert!(error.is_transport());

        let error: ApiError = SoapError::Http {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        assert!(error.is_transport());

        let error: ApiError = SoapError::Parse("bad XML".to_string()).into();
        assert!(matches!(error, ApiError::Protocol(_)));
        assert!(!error.is_transport());

        let error: ApiError = SoapError::Fault("no such subscription".to_string()).into();
        assert!(matches!(error, ApiError::Fault(_)));
        assert!(error.is_transport());
    }

    #[test]
    fn error_display() {
        let error = ApiError::Protocol("missing Expires".to_string());
        assert_eq!(format!("{}", error), "protocol error: missing Expires");
    }
}
