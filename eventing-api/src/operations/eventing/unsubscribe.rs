//! Unsubscribe operation ending a lease

use soap_client::{envelope, EnvelopeTransport, ReferenceParameter, SoapMessage};
use url::Url;

use crate::error::{ApiError, Result};

/// Unsubscribe operation for intentionally ending a lease
pub struct UnsubscribeOperation;

/// Response for the Unsubscribe operation
///
/// The unsubscribe response has no body payload; confirmation is carried
/// solely by the response action.
#[derive(Debug, Clone)]
pub struct UnsubscribeResponse {
    pub response_action: String,
}

impl UnsubscribeOperation {
    pub fn execute(
        transport: &dyn EnvelopeTransport,
        manager_address: &Url,
        reference_parameters: &[ReferenceParameter],
    ) -> Result<UnsubscribeResponse> {
        let envelope =
            envelope::unsubscribe_envelope(manager_address.as_str(), reference_parameters);
        let message =
            transport.post_envelope(manager_address, envelope::actions::UNSUBSCRIBE, &envelope)?;
        Self::read_response(&message)
    }

    fn read_response(message: &SoapMessage) -> Result<UnsubscribeResponse> {
        let response_action = message.action().unwrap_or_default();
        if response_action != envelope::actions::UNSUBSCRIBE_RESPONSE {
            return Err(ApiError::Protocol(format!(
                "unexpected unsubscribe response action: {:?}",
                response_action
            )));
        }
        Ok(UnsubscribeResponse { response_action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_action(action: &str) -> SoapMessage {
        let xml = format!(
            r#"<s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"
                             xmlns:wsa="http://www.w3.org/2005/08/addressing">
                <s12:Header><wsa:Action>{action}</wsa:Action></s12:Header>
                <s12:Body/>
            </s12:Envelope>"#,
        );
        SoapMessage::from_str(&xml).unwrap()
    }

    #[test]
    fn confirmation_action_is_accepted() {
        let message = response_with_action(envelope::actions::UNSUBSCRIBE_RESPONSE);
        let response = UnsubscribeOperation::read_response(&message).unwrap();
        assert_eq!(
            response.response_action,
            envelope::actions::UNSUBSCRIBE_RESPONSE
        );
    }

    #[test]
    fn wrong_action_is_a_hard_protocol_error() {
        let message = response_with_action(envelope::actions::RENEW_RESPONSE);
        let error = UnsubscribeOperation::read_response(&message).unwrap_err();
        assert!(matches!(error, ApiError::Protocol(_)));
    }
}
