//! Subscribe operation establishing a new lease

use serde::Serialize;
use soap_client::{envelope, EnvelopeTransport, ReferenceParameter, SoapMessage};
use url::Url;

use super::read_expires;
use crate::error::{ApiError, Result};

/// Subscribe operation for establishing an event subscription lease
pub struct SubscribeOperation;

/// Request for the Subscribe operation
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    /// Where the peer delivers notifications
    pub notify_to: String,
    /// Optional subscriber-generated correlation identifier for the
    /// notification address
    pub notify_identifier: Option<String>,
    /// Where the peer delivers the end-of-subscription message
    pub end_to: String,
    /// Optional subscriber-generated correlation identifier for the end
    /// address
    pub end_identifier: Option<String>,
    /// Requested lease duration in minutes
    pub expires_minutes: u32,
    /// Space-joined action filter
    pub filter: String,
}

/// Response for the Subscribe operation
#[derive(Debug, Clone)]
pub struct SubscribeResponse {
    /// Address all follow-up lease operations must be sent to
    pub manager_address: Url,
    /// Opaque parameters to echo on every follow-up request
    pub reference_parameters: Vec<ReferenceParameter>,
    /// Granted lease duration in seconds
    pub expires_seconds: f64,
}

impl SubscribeOperation {
    pub fn execute(
        transport: &dyn EnvelopeTransport,
        target: &Url,
        request: &SubscribeRequest,
    ) -> Result<SubscribeResponse> {
        let envelope = envelope::subscribe_envelope(
            target.as_str(),
            &request.notify_to,
            request.notify_identifier.as_deref(),
            &request.end_to,
            request.end_identifier.as_deref(),
            request.expires_minutes,
            &request.filter,
        );
        let message = transport.post_envelope(target, envelope::actions::SUBSCRIBE, &envelope)?;
        Self::read_response(&message)
    }

    fn read_response(message: &SoapMessage) -> Result<SubscribeResponse> {
        let response = message.body_child("SubscribeResponse").ok_or_else(|| {
            ApiError::Protocol("subscribe response has no SubscribeResponse element".to_string())
        })?;
        let manager = response.get_child("SubscriptionManager").ok_or_else(|| {
            ApiError::Protocol("subscribe response has no SubscriptionManager".to_string())
        })?;
        let address = manager
            .get_child("Address")
            .and_then(|a| a.get_text())
            .ok_or_else(|| {
                ApiError::Protocol("subscription manager has no Address".to_string())
            })?;
        let manager_address = Url::parse(address.trim()).map_err(|e| {
            ApiError::Protocol(format!("invalid subscription manager address: {}", e))
        })?;

        let mut reference_parameters = Vec::new();
        if let Some(parameters) = manager.get_child("ReferenceParameters") {
            for node in &parameters.children {
                if let xmltree::XMLNode::Element(element) = node {
                    reference_parameters.push(ReferenceParameter::from_element(element)?);
                }
            }
        }

        let expires_seconds = read_expires(response, "subscribe response")?;
        Ok(SubscribeResponse {
            manager_address,
            reference_parameters,
            expires_seconds,
        })
    }
}
