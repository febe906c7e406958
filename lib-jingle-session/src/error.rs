use xmpp_parsers::Element;

use crate::util::element_to_string;

/// Uniform record produced from a stanza error response or an IQ timeout.
///
/// `reason` is `"timeout"` when no response arrived, otherwise the tag name
/// of the first child of the `<error/>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct IqErrorRecord {
  /// The legacy `code` attribute of the `<error/>` element, if any.
  pub code: Option<String>,

  /// The error condition, or `"timeout"`.
  pub reason: String,

  /// The serialized request stanza that triggered the failure.
  pub source: Option<String>,

  /// The session the request belonged to.
  pub sid: String,
}

impl IqErrorRecord {
  /// Build a record from the `<error/>` element of an error reply.
  pub fn from_stanza_error(error: &Element, request: Option<&Element>, sid: &str) -> IqErrorRecord {
    IqErrorRecord {
      code: error.attr("code").map(str::to_owned),
      reason: error
        .children()
        .next()
        .map(|child| child.name().to_owned())
        .unwrap_or_else(|| "undefined".to_owned()),
      source: request.map(element_to_string),
      sid: sid.to_owned(),
    }
  }

  /// Build a record for a request that never got a reply.
  pub fn timeout(request: Option<&Element>, sid: &str) -> IqErrorRecord {
    IqErrorRecord {
      code: None,
      reason: "timeout".to_owned(),
      source: request.map(element_to_string),
      sid: sid.to_owned(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stanza_error_reason_is_first_child() {
    let error: Element =
      "<error xmlns='jabber:client' type='cancel' code='404'><item-not-found xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/></error>"
        .parse()
        .unwrap();
    let record = IqErrorRecord::from_stanza_error(&error, None, "sid1");
    assert_eq!(record.code.as_deref(), Some("404"));
    assert_eq!(record.reason, "item-not-found");
    assert_eq!(record.sid, "sid1");
  }

  #[test]
  fn timeout_reason() {
    let request: Element = "<iq xmlns='jabber:client' id='x' type='set'/>".parse().unwrap();
    let record = IqErrorRecord::timeout(Some(&request), "sid1");
    assert_eq!(record.reason, "timeout");
    assert_eq!(record.code, None);
    assert!(record.source.unwrap().contains("iq"));
  }
}
