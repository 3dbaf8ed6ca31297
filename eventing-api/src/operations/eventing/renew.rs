//! Renew operation extending an existing lease

use serde::Serialize;
use soap_client::{envelope, EnvelopeTransport, ReferenceParameter, SoapMessage};
use url::Url;

use super::read_expires;
use crate::error::{ApiError, Result};

/// Renew operation for extending an event subscription lease
pub struct RenewOperation;

/// Request for the Renew operation
#[derive(Debug, Clone, Serialize)]
pub struct RenewRequest {
    /// Requested lease duration in minutes
    pub expires_minutes: u32,
}

/// Response for the Renew operation
#[derive(Debug, Clone)]
pub struct RenewResponse {
    /// Granted lease duration in seconds
    pub expires_seconds: f64,
}

impl RenewOperation {
    pub fn execute(
        transport: &dyn EnvelopeTransport,
        manager_address: &Url,
        reference_parameters: &[ReferenceParameter],
        request: &RenewRequest,
    ) -> Result<RenewResponse> {
        let envelope = envelope::renew_envelope(
            manager_address.as_str(),
            reference_parameters,
            request.expires_minutes,
        );
        let message =
            transport.post_envelope(manager_address, envelope::actions::RENEW, &envelope)?;
        Self::read_response(&message)
    }

    fn read_response(message: &SoapMessage) -> Result<RenewResponse> {
        let response = message.body_child("RenewResponse").ok_or_else(|| {
            ApiError::Protocol("renew response has no RenewResponse element".to_string())
        })?;
        let expires_seconds = read_expires(response, "renew response")?;
        Ok(RenewResponse { expires_seconds })
    }
}
