//! WS-Eventing envelope construction
//!
//! Builds SOAP 1.2 request envelopes for the eventing operations and handles
//! the pieces of the wire format the rest of the SDK relies on: ISO 8601
//! lease durations and opaque reference parameters that must be echoed
//! verbatim on every request to a subscription manager.

use uuid::Uuid;

/// SOAP 1.2 envelope namespace
pub const NS_SOAP_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";
/// WS-Addressing 2005/08 namespace
pub const NS_WSA: &str = "http://www.w3.org/2005/08/addressing";
/// WS-Eventing 2004/08 namespace
pub const NS_WSE: &str = "http://schemas.xmlsoap.org/ws/2004/08/eventing";
/// Namespace of the subscriber-generated correlation identifier element
pub const NS_SUBSCRIBER_IDENT: &str = "http.local.com";
/// Local name of the subscriber-generated correlation identifier element
pub const SUBSCRIBER_IDENT_ELEMENT: &str = "SubscriberIdentifier";

/// Filter dialect for action-based subscription filters
pub const DIALECT_ACTION: &str = "http://docs.oasis-open.org/ws-dd/ns/dpws/2009/01/Action";
/// Push delivery mode
pub const DELIVERY_MODE_PUSH: &str =
    "http://schemas.xmlsoap.org/ws/2004/08/eventing/DeliveryModes/Push";

/// WS-Addressing action URIs of the eventing operations
pub mod actions {
    pub const SUBSCRIBE: &str = "http://schemas.xmlsoap.org/ws/2004/08/eventing/Subscribe";
    pub const SUBSCRIBE_RESPONSE: &str =
        "http://schemas.xmlsoap.org/ws/2004/08/eventing/SubscribeResponse";
    pub const RENEW: &str = "http://schemas.xmlsoap.org/ws/2004/08/eventing/Renew";
    pub const RENEW_RESPONSE: &str =
        "http://schemas.xmlsoap.org/ws/2004/08/eventing/RenewResponse";
    pub const GET_STATUS: &str = "http://schemas.xmlsoap.org/ws/2004/08/eventing/GetStatus";
    pub const GET_STATUS_RESPONSE: &str =
        "http://schemas.xmlsoap.org/ws/2004/08/eventing/GetStatusResponse";
    pub const UNSUBSCRIBE: &str = "http://schemas.xmlsoap.org/ws/2004/08/eventing/Unsubscribe";
    pub const UNSUBSCRIBE_RESPONSE: &str =
        "http://schemas.xmlsoap.org/ws/2004/08/eventing/UnsubscribeResponse";
    pub const SUBSCRIPTION_END: &str =
        "http://schemas.xmlsoap.org/ws/2004/08/eventing/SubscriptionEnd";
}

/// An opaque protocol-level identifier issued by the remote peer at
/// subscribe time.
///
/// Stored as the raw serialized element so that follow-up requests echo it
/// byte-for-byte; the only change ever applied is the mandatory
/// `wsa:IsReferenceParameter="true"` marker on the opening tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceParameter {
    xml: String,
}

impl ReferenceParameter {
    pub fn new(xml: impl Into<String>) -> Self {
        Self { xml: xml.into() }
    }

    /// Capture a parameter element from a parsed response.
    pub fn from_element(element: &xmltree::Element) -> Result<Self, crate::SoapError> {
        let mut buffer = Vec::new();
        let config = xmltree::EmitterConfig::new().write_document_declaration(false);
        element
            .write_with_config(&mut buffer, config)
            .map_err(|e| crate::SoapError::Parse(e.to_string()))?;
        let xml = String::from_utf8(buffer).map_err(|e| crate::SoapError::Parse(e.to_string()))?;
        Ok(Self { xml })
    }

    /// The parameter exactly as received.
    pub fn as_str(&self) -> &str {
        &self.xml
    }

    /// The parameter as a SOAP header element, marked as a reference
    /// parameter per the WS-Addressing SOAP binding.
    pub fn to_header_xml(&self) -> String {
        let xml = self.xml.trim();
        let mut in_quote: Option<char> = None;
        for (i, ch) in xml.char_indices() {
            match in_quote {
                Some(q) => {
                    if ch == q {
                        in_quote = None;
                    }
                }
                None => match ch {
                    '"' | '\'' => in_quote = Some(ch),
                    '>' => {
                        // honor self-closing tags
                        let head_end = if xml[..i].ends_with('/') { i - 1 } else { i };
                        return format!(
                            "{} wsa:IsReferenceParameter=\"true\"{}",
                            &xml[..head_end],
                            &xml[head_end..]
                        );
                    }
                    _ => {}
                },
            }
        }
        xml.to_string()
    }
}

/// Escape text for interpolation into XML content or attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Format a lease duration in whole minutes as an ISO 8601 duration.
pub fn format_expires_minutes(minutes: u32) -> String {
    format!("PT{}M", minutes)
}

/// Parse an ISO 8601 duration (`PnDTnHnMnS`, fractional seconds allowed)
/// into seconds.
///
/// Year and month components are rejected: lease durations are exact
/// second counts agreed with a remote peer, and calendar components have
/// no fixed length.
pub fn parse_iso_duration(text: &str) -> Option<f64> {
    let text = text.trim();
    let rest = text.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut seconds = 0.0_f64;
    let mut components = 0usize;

    let mut number = String::new();
    for ch in date_part.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
        } else {
            let value: f64 = number.parse().ok()?;
            number.clear();
            match ch {
                'D' => seconds += value * 86_400.0,
                _ => return None,
            }
            components += 1;
        }
    }
    if !number.is_empty() {
        return None;
    }

    if let Some(time_part) = time_part {
        for ch in time_part.chars() {
            if ch.is_ascii_digit() || ch == '.' {
                number.push(ch);
            } else {
                let value: f64 = number.parse().ok()?;
                number.clear();
                match ch {
                    'H' => seconds += value * 3_600.0,
                    'M' => seconds += value * 60.0,
                    'S' => seconds += value,
                    _ => return None,
                }
                components += 1;
            }
        }
        if !number.is_empty() {
            return None;
        }
    }

    if components == 0 {
        return None;
    }
    Some(seconds)
}

fn request_header(to: &str, action: &str, reference_parameters: &[ReferenceParameter]) -> String {
    let mut params = String::new();
    for parameter in reference_parameters {
        params.push_str(&parameter.to_header_xml());
    }
    format!(
        r#"<s12:Header><wsa:To s12:mustUnderstand="true">{to}</wsa:To><wsa:Action s12:mustUnderstand="true">{action}</wsa:Action><wsa:MessageID>urn:uuid:{message_id}</wsa:MessageID>{params}</s12:Header>"#,
        to = xml_escape(to),
        action = action,
        message_id = Uuid::new_v4(),
        params = params,
    )
}

fn envelope(header: &str, body: &str) -> String {
    format!(
        r#"<s12:Envelope xmlns:s12="{env}" xmlns:wsa="{wsa}" xmlns:wse="{wse}">{header}<s12:Body>{body}</s12:Body></s12:Envelope>"#,
        env = NS_SOAP_ENV,
        wsa = NS_WSA,
        wse = NS_WSE,
        header = header,
        body = body,
    )
}

fn endpoint_reference(address: &str, identifier: Option<&str>) -> String {
    match identifier {
        Some(identifier) => format!(
            r#"<wsa:Address>{address}</wsa:Address><wsa:ReferenceParameters><ident:{element} xmlns:ident="{ns}">{identifier}</ident:{element}></wsa:ReferenceParameters>"#,
            address = xml_escape(address),
            element = SUBSCRIBER_IDENT_ELEMENT,
            ns = NS_SUBSCRIBER_IDENT,
            identifier = xml_escape(identifier),
        ),
        None => format!("<wsa:Address>{}</wsa:Address>", xml_escape(address)),
    }
}

/// Build a Subscribe request envelope for a space-joined action filter.
#[allow(clippy::too_many_arguments)]
pub fn subscribe_envelope(
    to: &str,
    notify_to: &str,
    notify_identifier: Option<&str>,
    end_to: &str,
    end_identifier: Option<&str>,
    expires_minutes: u32,
    filter: &str,
) -> String {
    let body = format!(
        r#"<wse:Subscribe><wse:EndTo>{end_to}</wse:EndTo><wse:Delivery Mode="{mode}"><wse:NotifyTo>{notify_to}</wse:NotifyTo></wse:Delivery><wse:Expires>{expires}</wse:Expires><wse:Filter Dialect="{dialect}">{filter}</wse:Filter></wse:Subscribe>"#,
        end_to = endpoint_reference(end_to, end_identifier),
        mode = DELIVERY_MODE_PUSH,
        notify_to = endpoint_reference(notify_to, notify_identifier),
        expires = format_expires_minutes(expires_minutes),
        dialect = DIALECT_ACTION,
        filter = xml_escape(filter),
    );
    envelope(&request_header(to, actions::SUBSCRIBE, &[]), &body)
}

/// Build a Renew request envelope for an existing lease.
pub fn renew_envelope(
    to: &str,
    reference_parameters: &[ReferenceParameter],
    expires_minutes: u32,
) -> String {
    let body = format!(
        "<wse:Renew><wse:Expires>{}</wse:Expires></wse:Renew>",
        format_expires_minutes(expires_minutes)
    );
    envelope(&request_header(to, actions::RENEW, reference_parameters), &body)
}

/// Build a GetStatus request envelope for an existing lease.
pub fn get_status_envelope(to: &str, reference_parameters: &[ReferenceParameter]) -> String {
    envelope(
        &request_header(to, actions::GET_STATUS, reference_parameters),
        "<wse:GetStatus/>",
    )
}

/// Build an Unsubscribe request envelope for an existing lease.
pub fn unsubscribe_envelope(to: &str, reference_parameters: &[ReferenceParameter]) -> String {
    envelope(
        &request_header(to, actions::UNSUBSCRIBE, reference_parameters),
        "<wse:Unsubscribe/>",
    )
}
