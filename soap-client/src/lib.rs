//! Private SOAP client for WS-Eventing device communication
//!
//! This crate provides a minimal, blocking SOAP 1.2 client for talking to
//! DPWS-style devices: envelope construction for the eventing operations,
//! response parsing, and HTTP POST transport with bounded timeouts.

pub mod envelope;
mod error;
mod message;

pub use envelope::ReferenceParameter;
pub use error::SoapError;
pub use message::SoapMessage;

use std::time::Duration;

use url::Url;

/// The narrow transport contract of the SDK: post an envelope to an
/// address, get back a parsed response or a typed error.
///
/// `SoapClient` is the production implementation; tests substitute mocks.
pub trait EnvelopeTransport: Send + Sync {
    fn post_envelope(
        &self,
        target: &Url,
        action: &str,
        envelope: &str,
    ) -> Result<SoapMessage, SoapError>;
}

/// A minimal SOAP 1.2 client for WS-Eventing communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
}

impl SoapClient {
    /// Create a new SOAP client with default timeouts.
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a new SOAP client with the given connect and read timeouts.
    ///
    /// The read timeout bounds every eventing request, so one unresponsive
    /// peer cannot stall a maintenance pass indefinitely.
    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .build(),
        }
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeTransport for SoapClient {
    fn post_envelope(
        &self,
        target: &Url,
        action: &str,
        envelope: &str,
    ) -> Result<SoapMessage, SoapError> {
        let content_type = format!(
            "application/soap+xml; charset=utf-8; action=\"{}\"",
            action
        );
        let response = self
            .agent
            .post(target.as_str())
            .set("Content-Type", &content_type)
            .send_string(envelope)
            .map_err(|e| match e {
                ureq::Error::Status(status, response) => SoapError::Http {
                    status,
                    body: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => SoapError::Network(transport.to_string()),
            })?;

        let body = response
            .into_string()
            .map_err(|e| SoapError::Network(e.to_string()))?;
        let message = SoapMessage::from_str(&body)?;
        if let Some(reason) = message.fault() {
            return Err(SoapError::Fault(reason));
        }
        Ok(message)
    }
}
