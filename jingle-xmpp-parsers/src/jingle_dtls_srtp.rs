use std::convert::TryFrom;

use xmpp_parsers::{ns::JINGLE_DTLS, Element, Error};

pub use xmpp_parsers::jingle_dtls_srtp::Setup;

/// Fingerprint of the key used for a DTLS handshake.
///
/// Unlike the upstream element this keeps the hash algorithm and the value
/// as the strings that travel on the SDP `a=fingerprint` line, and carries
/// the `required` attribute Jitsi Meet sets on its transports.
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
  /// The hash algorithm used for this fingerprint, e.g. `sha-256`.
  pub hash: String,

  /// Which of the end points should initiate the connection establishment.
  pub setup: Option<Setup>,

  /// Whether DTLS is mandatory.
  pub required: Option<String>,

  /// Colon-separated uppercase hex value of this fingerprint.
  pub value: String,
}

impl Fingerprint {
  /// Create a new required fingerprint from the parts of an SDP line.
  pub fn required(hash: &str, value: &str) -> Fingerprint {
    Fingerprint {
      hash: hash.to_owned(),
      setup: None,
      required: Some(true.to_string()),
      value: value.to_owned(),
    }
  }

  /// Set the connection establishment direction.
  pub fn with_setup(mut self, setup: Setup) -> Fingerprint {
    self.setup = Some(setup);
    self
  }
}

impl TryFrom<Element> for Fingerprint {
  type Error = Error;

  fn try_from(root: Element) -> Result<Fingerprint, Error> {
    if !root.is("fingerprint", JINGLE_DTLS) {
      return Err(Error::ParseError("This is not a fingerprint element."));
    }
    Ok(Fingerprint {
      hash: root
        .attr("hash")
        .ok_or(Error::ParseError("Required attribute 'hash' missing."))?
        .to_owned(),
      setup: root.attr("setup").map(str::parse).transpose()?,
      required: root.attr("required").map(str::to_owned),
      value: root.text(),
    })
  }
}

impl From<Fingerprint> for Element {
  fn from(fingerprint: Fingerprint) -> Element {
    Element::builder("fingerprint", JINGLE_DTLS)
      .attr("hash", fingerprint.hash)
      .attr("setup", fingerprint.setup)
      .attr("required", fingerprint.required)
      .append(fingerprint.value)
      .build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_jitsi_meet() {
    let elem: Element = "<fingerprint hash='sha-1' setup='actpass' required='true' xmlns='urn:xmpp:jingle:apps:dtls:0'>97:F2:B5:BE:DB:A6:00:B1:3E:40:B2:41:3C:0D:FC:E0:BD:B2:A0:E8</fingerprint>"
      .parse()
      .unwrap();
    let fingerprint = Fingerprint::try_from(elem).unwrap();
    assert_eq!(fingerprint.hash, "sha-1");
    assert_eq!(fingerprint.setup, Some(Setup::Actpass));
    assert_eq!(fingerprint.required.as_deref(), Some("true"));
    assert_eq!(
      fingerprint.value,
      "97:F2:B5:BE:DB:A6:00:B1:3E:40:B2:41:3C:0D:FC:E0:BD:B2:A0:E8"
    );
  }

  #[test]
  fn round_trip() {
    let fingerprint = Fingerprint::required("sha-256", "AB:CD:EF").with_setup(Setup::Active);
    let elem = Element::from(fingerprint.clone());
    assert_eq!(Fingerprint::try_from(elem).unwrap(), fingerprint);
  }
}
