//! Error types for the SOAP client

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Connection-level error (refused, reset, timeout, DNS failure)
    #[error("network error: {0}")]
    Network(String),

    /// The peer answered with a non-2xx HTTP status
    #[error("HTTP status {status}: {body}")]
    Http { status: u16, body: String },

    /// The response could not be parsed as a SOAP envelope
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Well-formed SOAP fault returned by the peer
    #[error("SOAP fault: {0}")]
    Fault(String),
}

impl SoapError {
    /// True for errors of the transport layer (connection or HTTP status),
    /// false for malformed or fault responses.
    pub fn is_transport(&self) -> bool {
        matches!(self, SoapError::Network(_) | SoapError::Http { .. })
    }
}
