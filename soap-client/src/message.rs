//! Parsed SOAP envelope wrapper
//!
//! `SoapMessage` wraps a parsed envelope (a response to one of our requests
//! or an inbound notification/subscription-end message) and exposes the
//! handful of lookups the SDK needs: the WS-Addressing action, header
//! elements and body children.

use xmltree::{Element, XMLNode};

use crate::error::SoapError;

/// A parsed SOAP envelope.
#[derive(Debug, Clone)]
pub struct SoapMessage {
    root: Element,
}

impl SoapMessage {
    /// Parse an envelope from raw bytes.
    pub fn parse(xml: &[u8]) -> Result<Self, SoapError> {
        let root = Element::parse(xml).map_err(|e| SoapError::Parse(e.to_string()))?;
        if root.name != "Envelope" {
            return Err(SoapError::Parse(format!(
                "expected Envelope root element, got {}",
                root.name
            )));
        }
        Ok(Self { root })
    }

    /// Parse an envelope from a string.
    pub fn from_str(xml: &str) -> Result<Self, SoapError> {
        Self::parse(xml.as_bytes())
    }

    /// The full envelope element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The SOAP header, if present.
    pub fn header(&self) -> Option<&Element> {
        self.root.get_child("Header")
    }

    /// The WS-Addressing action of this message, if present.
    pub fn action(&self) -> Option<String> {
        self.header()?
            .get_child("Action")?
            .get_text()
            .map(|t| t.trim().to_string())
    }

    /// Text content of every header element with the given local name.
    pub fn header_values(&self, local_name: &str) -> Vec<String> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        header
            .children
            .iter()
            .filter_map(|node| match node {
                XMLNode::Element(element) if element.name == local_name => {
                    element.get_text().map(|t| t.trim().to_string())
                }
                _ => None,
            })
            .collect()
    }

    /// The SOAP body.
    pub fn body(&self) -> Result<&Element, SoapError> {
        self.root
            .get_child("Body")
            .ok_or_else(|| SoapError::Parse("missing SOAP Body".to_string()))
    }

    /// First body child with the given local name.
    pub fn body_child(&self, local_name: &str) -> Option<&Element> {
        self.body().ok()?.get_child(local_name)
    }

    /// Fault reason, if the body carries a SOAP fault.
    pub fn fault(&self) -> Option<String> {
        let fault = self.body().ok()?.get_child("Fault")?;
        let reason = fault
            .get_child("Reason")
            .and_then(|r| r.get_child("Text"))
            .and_then(|t| t.get_text())
            .map(|t| t.trim().to_string());
        let code = fault
            .get_child("Code")
            .and_then(|c| c.get_child("Value"))
            .and_then(|v| v.get_text())
            .map(|t| t.trim().to_string());
        match (code, reason) {
            (Some(code), Some(reason)) => Some(format!("{}: {}", code, reason)),
            (None, Some(reason)) => Some(reason),
            (Some(code), None) => Some(code),
            (None, None) => Some("unspecified fault".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENEW_RESPONSE: &str = r#"
        <s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"
                      xmlns:wsa="http://www.w3.org/2005/08/addressing"
                      xmlns:wse="http://schemas.xmlsoap.org/ws/2004/08/eventing">
            <s12:Header>
                <wsa:Action>http://schemas.xmlsoap.org/ws/2004/08/eventing/RenewResponse</wsa:Action>
            </s12:Header>
            <s12:Body>
                <wse:RenewResponse>
                    <wse:Expires>PT3600S</wse:Expires>
                </wse:RenewResponse>
            </s12:Body>
        </s12:Envelope>
    "#;

    #[test]
    fn reads_action_and_body_child() {
        let message = SoapMessage::from_str(RENEW_RESPONSE).unwrap();
        assert_eq!(
            message.action().as_deref(),
            Some("http://schemas.xmlsoap.org/ws/2004/08/eventing/RenewResponse")
        );
        let expires = message
            .body_child("RenewResponse")
            .and_then(|r| r.get_child("Expires"))
            .and_then(|e| e.get_text())
            .unwrap();
        assert_eq!(expires.trim(), "PT3600S");
    }

    #[test]
    fn rejects_non_envelope_root() {
        let result = SoapMessage::from_str("<NotAnEnvelope/>");
        assert!(matches!(result, Err(SoapError::Parse(_))));
    }

    #[test]
    fn missing_body_is_a_parse_error() {
        let xml = r#"<s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"></s12:Envelope>"#;
        let message = SoapMessage::from_str(xml).unwrap();
        assert!(matches!(message.body(), Err(SoapError::Parse(_))));
    }

    #[test]
    fn extracts_fault_code_and_reason() {
        let xml = r#"
            <s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope">
                <s12:Body>
                    <s12:Fault>
                        <s12:Code><s12:Value>s12:Receiver</s12:Value></s12:Code>
                        <s12:Reason><s12:Text xml:lang="en">no such subscription</s12:Text></s12:Reason>
                    </s12:Fault>
                </s12:Body>
            </s12:Envelope>
        "#;
        let message = SoapMessage::from_str(xml).unwrap();
        assert_eq!(
            message.fault().as_deref(),
            Some("s12:Receiver: no such subscription")
        );
    }

    #[test]
    fn header_values_collects_matching_elements() {
        let xml = r#"
            <s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"
                          xmlns:ident="http.local.com">
                <s12:Header>
                    <ident:SubscriberIdentifier>urn:uuid:abc</ident:SubscriberIdentifier>
                    <other:Thing xmlns:other="urn:o">x</other:Thing>
                </s12:Header>
                <s12:Body/>
            </s12:Envelope>
        "#;
        let message = SoapMessage::from_str(xml).unwrap();
        assert_eq!(
            message.header_values("SubscriberIdentifier"),
            vec!["urn:uuid:abc".to_string()]
        );
        assert!(message.header_values("Missing").is_empty());
    }
}
