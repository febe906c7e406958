use std::convert::TryFrom;

use xmpp_parsers::{Element, Error};

use crate::ns::JINGLE_DTLS_SCTP;

/// SCTP association details for a WebRTC datachannel (XEP-0343).
#[derive(Debug, Clone, PartialEq)]
pub struct SctpMap {
  /// The SCTP port number.
  pub number: u16,

  /// The application protocol, `webrtc-datachannel` in practice.
  pub protocol: String,

  /// How many streams the association supports.
  pub streams: Option<u16>,
}

impl SctpMap {
  /// Create a new webrtc-datachannel map on the given port.
  pub fn new(number: u16) -> SctpMap {
    SctpMap {
      number,
      protocol: "webrtc-datachannel".to_owned(),
      streams: None,
    }
  }
}

impl TryFrom<Element> for SctpMap {
  type Error = Error;

  fn try_from(root: Element) -> Result<SctpMap, Error> {
    if !root.is("sctpmap", JINGLE_DTLS_SCTP) {
      return Err(Error::ParseError("This is not a sctpmap element."));
    }
    Ok(SctpMap {
      number: root
        .attr("number")
        .ok_or(Error::ParseError("Required attribute 'number' missing."))?
        .parse()?,
      protocol: root
        .attr("protocol")
        .ok_or(Error::ParseError("Required attribute 'protocol' missing."))?
        .to_owned(),
      streams: root.attr("streams").map(str::parse).transpose()?,
    })
  }
}

impl From<SctpMap> for Element {
  fn from(sctp: SctpMap) -> Element {
    Element::builder("sctpmap", JINGLE_DTLS_SCTP)
      .attr("number", sctp.number.to_string())
      .attr("protocol", sctp.protocol)
      .attr("streams", sctp.streams.map(|s| s.to_string()))
      .build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_sctpmap() {
    let elem: Element =
      "<sctpmap xmlns='urn:xmpp:jingle:transports:dtls-sctp:1' number='5000' protocol='webrtc-datachannel' streams='1024'/>"
        .parse()
        .unwrap();
    let sctp = SctpMap::try_from(elem).unwrap();
    assert_eq!(sctp.number, 5000);
    assert_eq!(sctp.protocol, "webrtc-datachannel");
    assert_eq!(sctp.streams, Some(1024));
  }
}
