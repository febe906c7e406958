use std::convert::TryFrom;

use xmpp_parsers::{
  ns::{JINGLE_DTLS, JINGLE_ICE_UDP},
  Element, Error,
};

pub use xmpp_parsers::jingle_ice_udp::{Candidate, Type as CandidateType};

use crate::{jingle_dtls_srtp::Fingerprint, jingle_sctp::SctpMap, ns::JINGLE_DTLS_SCTP};

/// Wrapper element for an ICE-UDP transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IceUdpTransport {
  /// A User Fragment as defined in ICE-CORE.
  pub ufrag: Option<String>,

  /// A Password as defined in ICE-CORE.
  pub pwd: Option<String>,

  /// Fingerprint of the key used for the DTLS handshake.
  pub fingerprint: Option<Fingerprint>,

  /// List of candidates for this ICE-UDP session.
  pub candidates: Vec<Candidate>,

  /// SCTP association riding on this transport, if any.
  pub sctp: Option<SctpMap>,
}

impl IceUdpTransport {
  /// Create a new ICE-UDP transport.
  pub fn new() -> IceUdpTransport {
    Default::default()
  }

  /// Set the ICE credentials of this transport.
  pub fn with_credentials(mut self, ufrag: &str, pwd: &str) -> Self {
    self.ufrag = Some(ufrag.to_owned());
    self.pwd = Some(pwd.to_owned());
    self
  }

  /// Set the DTLS-SRTP fingerprint of this transport.
  pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
    self.fingerprint = Some(fingerprint);
    self
  }

  /// Add a candidate to this transport.
  pub fn add_candidate(mut self, candidate: Candidate) -> Self {
    self.candidates.push(candidate);
    self
  }
}

impl TryFrom<Element> for IceUdpTransport {
  type Error = Error;

  fn try_from(root: Element) -> Result<IceUdpTransport, Error> {
    if !root.is("transport", JINGLE_ICE_UDP) {
      return Err(Error::ParseError("This is not an ICE-UDP transport element."));
    }
    let mut transport = IceUdpTransport {
      ufrag: root.attr("ufrag").map(str::to_owned),
      pwd: root.attr("pwd").map(str::to_owned),
      fingerprint: None,
      candidates: Vec::new(),
      sctp: None,
    };
    for child in root.children().cloned() {
      if child.is("candidate", JINGLE_ICE_UDP) {
        transport.candidates.push(Candidate::try_from(child)?);
      }
      else if child.is("fingerprint", JINGLE_DTLS) {
        transport.fingerprint = Some(Fingerprint::try_from(child)?);
      }
      else if child.is("sctpmap", JINGLE_DTLS_SCTP) {
        transport.sctp = Some(SctpMap::try_from(child)?);
      }
    }
    Ok(transport)
  }
}

impl From<IceUdpTransport> for Element {
  fn from(transport: IceUdpTransport) -> Element {
    Element::builder("transport", JINGLE_ICE_UDP)
      .attr("ufrag", transport.ufrag)
      .attr("pwd", transport.pwd)
      .append_all(transport.fingerprint.map(Element::from))
      .append_all(transport.candidates)
      .append_all(transport.sctp.map(Element::from))
      .build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_jitsi_meet() {
    let elem: Element = "<transport ufrag='2acq51d4p07v2m' pwd='7lk9uul39gckit6t02oavv2r9j' xmlns='urn:xmpp:jingle:transports:ice-udp:1'>
    <fingerprint hash='sha-1' setup='actpass' xmlns='urn:xmpp:jingle:apps:dtls:0'>97:F2:B5:BE:DB:A6:00:B1:3E:40:B2:41:3C:0D:FC:E0:BD:B2:A0:E8</fingerprint>
    <candidate type='host' protocol='udp' id='186cb069513c2bbe546192c93cc4ab3b05ab0d426' ip='2a05:d014:fc7:54a1:8bfc:7248:3d1c:51a4' component='1' port='10000' foundation='1' generation='0' priority='2130706431' network='0'/>
    <candidate rel-port='10000' type='srflx' protocol='udp' id='186cb069513c2bbe546192c93cc4ab3b05d449db8' ip='3.120.176.51' component='1' port='10000' foundation='3' generation='0' network='0' priority='1677724415' rel-addr='10.15.1.120'/>
    <sctpmap xmlns='urn:xmpp:jingle:transports:dtls-sctp:1' number='5000' protocol='webrtc-datachannel' streams='1024'/>
</transport>"
      .parse()
      .unwrap();
    let transport = IceUdpTransport::try_from(elem).unwrap();
    assert_eq!(transport.ufrag.as_deref(), Some("2acq51d4p07v2m"));
    assert_eq!(transport.pwd.as_deref(), Some("7lk9uul39gckit6t02oavv2r9j"));
    assert_eq!(transport.candidates.len(), 2);
    assert_eq!(transport.candidates[0].type_, CandidateType::Host);
    assert_eq!(transport.candidates[1].type_, CandidateType::Srflx);
    assert_eq!(
      transport.candidates[1].rel_addr,
      Some("10.15.1.120".parse().unwrap())
    );
    assert_eq!(transport.sctp.unwrap().number, 5000);
    assert_eq!(transport.fingerprint.unwrap().hash, "sha-1");
  }

  #[test]
  fn transport_round_trip() {
    let candidate = Candidate {
      component: 1,
      foundation: "1".to_owned(),
      generation: 0,
      id: "abcd".to_owned(),
      ip: "10.0.0.1".parse().unwrap(),
      network: Some(0),
      port: 10000,
      priority: 2130706431,
      protocol: "udp".to_owned(),
      rel_addr: None,
      rel_port: None,
      type_: CandidateType::Host,
    };
    let transport = IceUdpTransport::new()
      .with_credentials("u1", "p1")
      .add_candidate(candidate);
    let elem = Element::from(transport.clone());
    assert_eq!(IceUdpTransport::try_from(elem).unwrap(), transport);
  }
}
