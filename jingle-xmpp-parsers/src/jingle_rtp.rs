use std::convert::TryFrom;

use xmpp_parsers::{
  jingle_rtp_hdrext::RtpHdrext,
  ns::{JINGLE_RTP, JINGLE_RTP_HDREXT, JINGLE_SSMA},
  Element, Error,
};

pub use xmpp_parsers::jingle_rtp::PayloadType;

use crate::jingle_ssma::{Source, SsrcGroup};

/// Wrapper element describing an RTP session.
#[derive(Debug, Clone, PartialEq)]
pub struct RtpDescription {
  /// The media type, `audio` or `video`.
  pub media: String,

  /// The stated ssrc of the description, if any.
  pub ssrc: Option<String>,

  /// List of encodings that can be used for this RTP stream.
  pub payload_types: Vec<PayloadType>,

  /// Whether RTP and RTCP are multiplexed on a single port (RFC 5761).
  pub rtcp_mux: bool,

  /// List of ssrc carried in this description.
  pub ssrcs: Vec<Source>,

  /// List of ssrc-group.
  pub ssrc_groups: Vec<SsrcGroup>,

  /// List of header extensions.
  pub hdrexts: Vec<RtpHdrext>,
}

impl RtpDescription {
  /// Create a new RTP description.
  pub fn new(media: String) -> RtpDescription {
    RtpDescription {
      media,
      ssrc: None,
      payload_types: Vec::new(),
      rtcp_mux: false,
      ssrcs: Vec::new(),
      ssrc_groups: Vec::new(),
      hdrexts: Vec::new(),
    }
  }
}

impl TryFrom<Element> for RtpDescription {
  type Error = Error;

  fn try_from(root: Element) -> Result<RtpDescription, Error> {
    if !root.is("description", JINGLE_RTP) {
      return Err(Error::ParseError("This is not an RTP description element."));
    }
    let mut description = RtpDescription {
      media: root
        .attr("media")
        .ok_or(Error::ParseError("Required attribute 'media' missing."))?
        .to_owned(),
      ssrc: root.attr("ssrc").map(str::to_owned),
      payload_types: Vec::new(),
      rtcp_mux: false,
      ssrcs: Vec::new(),
      ssrc_groups: Vec::new(),
      hdrexts: Vec::new(),
    };
    for child in root.children().cloned() {
      if child.is("payload-type", JINGLE_RTP) {
        description.payload_types.push(PayloadType::try_from(child)?);
      }
      else if child.is("rtcp-mux", JINGLE_RTP) {
        description.rtcp_mux = true;
      }
      else if child.is("source", JINGLE_SSMA) {
        description.ssrcs.push(Source::try_from(child)?);
      }
      else if child.is("ssrc-group", JINGLE_SSMA) {
        description.ssrc_groups.push(SsrcGroup::try_from(child)?);
      }
      else if child.is("rtp-hdrext", JINGLE_RTP_HDREXT) {
        description.hdrexts.push(RtpHdrext::try_from(child)?);
      }
    }
    Ok(description)
  }
}

impl From<RtpDescription> for Element {
  fn from(description: RtpDescription) -> Element {
    Element::builder("description", JINGLE_RTP)
      .attr("media", description.media)
      .attr("ssrc", description.ssrc)
      .append_all(description.payload_types)
      .append_all(
        description
          .rtcp_mux
          .then(|| Element::builder("rtcp-mux", JINGLE_RTP).build()),
      )
      .append_all(description.ssrcs)
      .append_all(description.ssrc_groups)
      .append_all(description.hdrexts)
      .build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_description() {
    let elem: Element = "<description media='audio' xmlns='urn:xmpp:jingle:apps:rtp:1'>
        <payload-type id='111' name='opus' clockrate='48000' channels='2' xmlns='urn:xmpp:jingle:apps:rtp:1'/>
        <rtcp-mux xmlns='urn:xmpp:jingle:apps:rtp:1'/>
        <source ssrc='3102825617' xmlns='urn:xmpp:jingle:apps:rtp:ssma:0'>
          <parameter name='cname' value='mixed'/>
        </source>
      </description>"
      .parse()
      .unwrap();
    let description = RtpDescription::try_from(elem).unwrap();
    assert_eq!(description.media, "audio");
    assert!(description.rtcp_mux);
    assert_eq!(description.payload_types.len(), 1);
    assert_eq!(description.payload_types[0].name.as_deref(), Some("opus"));
    assert_eq!(description.ssrcs.len(), 1);
    assert_eq!(description.ssrcs[0].id, 3102825617);
  }
}
