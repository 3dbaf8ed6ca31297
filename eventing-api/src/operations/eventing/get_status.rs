//! GetStatus operation querying the remaining lease time

use soap_client::{envelope, EnvelopeTransport, ReferenceParameter, SoapMessage};
use url::Url;

use super::read_expires;
use crate::error::{ApiError, Result};

/// GetStatus operation for querying the remaining time of a lease
///
/// Not every peer implements status queries faithfully; the lifecycle
/// manager offers a renew-only keep-alive mode as the workaround.
pub struct GetStatusOperation;

/// Response for the GetStatus operation
#[derive(Debug, Clone)]
pub struct GetStatusResponse {
    /// Remaining lease duration in seconds, as reported by the peer
    pub expires_seconds: f64,
}

impl GetStatusOperation {
    pub fn execute(
        transport: &dyn EnvelopeTransport,
        manager_address: &Url,
        reference_parameters: &[ReferenceParameter],
    ) -> Result<GetStatusResponse> {
        let envelope =
            envelope::get_status_envelope(manager_address.as_str(), reference_parameters);
        let message =
            transport.post_envelope(manager_address, envelope::actions::GET_STATUS, &envelope)?;
        Self::read_response(&message)
    }

    fn read_response(message: &SoapMessage) -> Result<GetStatusResponse> {
        let response = message.body_child("GetStatusResponse").ok_or_else(|| {
            ApiError::Protocol("status response has no GetStatusResponse element".to_string())
        })?;
        let expires_seconds = read_expires(response, "status response")?;
        Ok(GetStatusResponse { expires_seconds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_remaining_time() {
        let xml = r#"
            <s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"
                          xmlns:wse="http://schemas.xmlsoap.org/ws/2004/08/eventing">
                <s12:Body>
                    <wse:GetStatusResponse><wse:Expires>PT0H5M30S</wse:Expires></wse:GetStatusResponse>
                </s12:Body>
            </s12:Envelope>
        "#;
        let message = SoapMessage::from_str(xml).unwrap();
        let response = GetStatusOperation::read_response(&message).unwrap();
        assert_eq!(response.expires_seconds, 330.0);
    }

    #[test]
    fn missing_expires_is_protocol_error() {
        let xml = r#"
            <s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"
                          xmlns:wse="http://schemas.xmlsoap.org/ws/2004/08/eventing">
                <s12:Body><wse:GetStatusResponse/></s12:Body>
            </s12:Envelope>
        "#;
        let message = SoapMessage::from_str(xml).unwrap();
        let error = GetStatusOperation::read_response(&message).unwrap_err();
        assert!(matches!(error, ApiError::Protocol(_)));
    }
}
